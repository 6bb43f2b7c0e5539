use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // unique, never updated
    pub name: String,
    pub picture: Option<String>,
    pub joined_events: Vec<Uuid>, // set semantics
    pub created_at: OffsetDateTime,
    pub last_login: OffsetDateTime,
}
