use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::CreateEventRequest,
    repo::EventStore,
    repo_types::{Comment, NewEvent, DEFAULT_EVENT_IMAGE},
};
use crate::{auth::repo::UserStore, error::AppError};

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an id supplied by the client.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation(format!("{field} is malformed")))
}

pub(crate) fn validate_new_event(req: CreateEventRequest) -> Result<NewEvent, AppError> {
    let title = req.title.trim().to_string();
    let date = req.date.trim().to_string();
    if title.is_empty() || date.is_empty() {
        return Err(AppError::validation("title and date are required"));
    }
    Ok(NewEvent {
        title,
        date,
        time: non_blank(req.time),
        location: non_blank(req.location),
        category: non_blank(req.category),
        description: non_blank(req.description),
        image: non_blank(req.image).unwrap_or_else(|| DEFAULT_EVENT_IMAGE.to_string()),
    })
}

pub async fn create_event(
    events: &dyn EventStore,
    creator_id: Uuid,
    creator_name: &str,
    req: CreateEventRequest,
) -> Result<Uuid, AppError> {
    let event = validate_new_event(req)?;
    let id = events.create(creator_id, creator_name, event).await?;
    info!(event_id = %id, creator_id = %creator_id, "event created");
    Ok(id)
}

/// RSVP the caller to an event.
///
/// Two set-inserts on two records with no transaction around them. If the
/// process dies between them the event lists the user but the user does
/// not list the event; both steps are idempotent, so repeating the join
/// repairs it. The caller is resolved first so an unknown user never
/// lands in an attendee list.
pub async fn join_event(
    events: &dyn EventStore,
    users: &dyn UserStore,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    users.find_by_id(user_id).await?;
    events.add_attendee(event_id, user_id).await?;
    users.add_joined_event(user_id, event_id).await?;
    info!(event_id = %event_id, user_id = %user_id, "event joined");
    Ok(())
}

pub async fn add_comment(
    events: &dyn EventStore,
    users: &dyn UserStore,
    event_id: Uuid,
    author_id: Uuid,
    text: &str,
) -> Result<Comment, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::validation("comment text is required"));
    }
    let author = users.find_by_id(author_id).await?;
    let comment = Comment {
        id: Uuid::new_v4(),
        author_id,
        author_name: author.name,
        text: text.to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    events.push_comment(event_id, comment.clone()).await?;
    info!(event_id = %event_id, comment_id = %comment.id, "comment added");
    Ok(comment)
}

pub async fn delete_comment(
    events: &dyn EventStore,
    event_id: Uuid,
    comment_id: Uuid,
    caller_id: Uuid,
) -> Result<(), AppError> {
    events.delete_comment(event_id, comment_id, caller_id).await?;
    info!(event_id = %event_id, comment_id = %comment_id, "comment deleted");
    Ok(())
}

/// Delete an event, then unlink it from its attendees' joined sets.
/// The unlink is a second write with the same crash window as joining.
pub async fn delete_event(
    events: &dyn EventStore,
    users: &dyn UserStore,
    event_id: Uuid,
    caller_id: Uuid,
) -> Result<(), AppError> {
    events.delete(event_id, caller_id).await?;
    users.forget_event(event_id).await?;
    info!(event_id = %event_id, "event deleted");
    Ok(())
}
