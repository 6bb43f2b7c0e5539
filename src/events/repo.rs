use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Comment, CommentRow, Event, EventRow, NewEvent};
use crate::error::AppError;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events, ascending by date.
    async fn list(&self) -> Result<Vec<Event>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Event, AppError>;

    async fn create(
        &self,
        creator_id: Uuid,
        creator_name: &str,
        event: NewEvent,
    ) -> Result<Uuid, AppError>;

    /// Set-insert into the attendee list; repeating it is a no-op.
    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    async fn push_comment(&self, event_id: Uuid, comment: Comment) -> Result<(), AppError>;

    /// Removes the comment only when both id and author match.
    /// Anything else is `Forbidden`, whether or not the comment exists.
    async fn delete_comment(
        &self,
        event_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<(), AppError>;

    /// Deletes an event owned by `caller_id`, with its comments and attendees.
    async fn delete(&self, event_id: Uuid, caller_id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgEventStore {
    db: PgPool,
}

impl PgEventStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, date, time, location, category, description,
                   creator_id, creator_name, image, attendees, created_at
            FROM events
            ORDER BY date ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let comment_rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT event_id, id, author_id, author_name, text, created_at
            FROM event_comments
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_event: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for c in comment_rows {
            by_event.entry(c.event_id).or_default().push(c.into());
        }

        Ok(rows
            .into_iter()
            .map(|r| {
                let comments = by_event.remove(&r.id).unwrap_or_default();
                r.into_event(comments)
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Event, AppError> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, date, time, location, category, description,
                   creator_id, creator_name, image, attendees, created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("event"))?;

        let comments = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT event_id, id, author_id, author_name, text, created_at
            FROM event_comments
            WHERE event_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(row.into_event(comments.into_iter().map(Comment::from).collect()))
    }

    async fn create(
        &self,
        creator_id: Uuid,
        creator_name: &str,
        event: NewEvent,
    ) -> Result<Uuid, AppError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO events (id, title, date, time, location, category, description,
                                creator_id, creator_name, image, attendees, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, '{}', now())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.title)
        .bind(&event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(&event.category)
        .bind(&event.description)
        .bind(creator_id)
        .bind(creator_name)
        .bind(&event.image)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let found: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE events
               SET attendees = CASE
                       WHEN $2 = ANY(attendees) THEN attendees
                       ELSE array_append(attendees, $2)
                   END
             WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        found.map(|_| ()).ok_or(AppError::NotFound("event"))
    }

    async fn push_comment(&self, event_id: Uuid, comment: Comment) -> Result<(), AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO event_comments (id, event_id, author_id, author_name, text, created_at)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (SELECT 1 FROM events WHERE id = $2)
            "#,
        )
        .bind(comment.id)
        .bind(event_id)
        .bind(comment.author_id)
        .bind(&comment.author_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("event"));
        }
        Ok(())
    }

    async fn delete_comment(
        &self,
        event_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<(), AppError> {
        let res = sqlx::query(
            r#"
            DELETE FROM event_comments
             WHERE id = $1 AND event_id = $2 AND author_id = $3
            "#,
        )
        .bind(comment_id)
        .bind(event_id)
        .bind(author_id)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    async fn delete(&self, event_id: Uuid, caller_id: Uuid) -> Result<(), AppError> {
        let owner: Option<(Uuid,)> =
            sqlx::query_as(r#"SELECT creator_id FROM events WHERE id = $1"#)
                .bind(event_id)
                .fetch_optional(&self.db)
                .await?;
        match owner {
            None => return Err(AppError::NotFound("event")),
            Some((creator_id,)) if creator_id != caller_id => return Err(AppError::Forbidden),
            Some(_) => {}
        }

        // comments go with the row via ON DELETE CASCADE
        let res = sqlx::query(r#"DELETE FROM events WHERE id = $1 AND creator_id = $2"#)
            .bind(event_id)
            .bind(caller_id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("event"));
        }
        Ok(())
    }
}
