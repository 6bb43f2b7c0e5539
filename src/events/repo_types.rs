use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_EVENT_IMAGE: &str =
    "https://images.unsplash.com/photo-1540575467063-178a50c2df87";

/// Validated fields of an event about to be stored.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: String,
}

/// Row of the `events` table, comments excluded.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub image: String,
    pub attendees: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub event_id: Uuid,
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String, // copied from the author at write time
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub image: String,
    pub attendees: Vec<Uuid>,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Self {
            id: r.id,
            author_id: r.author_id,
            author_name: r.author_name,
            text: r.text,
            created_at: r.created_at,
        }
    }
}

impl EventRow {
    pub fn into_event(self, comments: Vec<Comment>) -> Event {
        Event {
            id: self.id,
            title: self.title,
            date: self.date,
            time: self.time,
            location: self.location,
            category: self.category,
            description: self.description,
            creator_id: self.creator_id,
            creator_name: self.creator_name,
            image: self.image,
            attendees: self.attendees,
            comments,
            created_at: self.created_at,
        }
    }
}
