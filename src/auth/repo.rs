use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{auth::repo_types::User, error::AppError};

/// Identity store: users keyed by their verified email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find-or-create by email. Existing users get name, picture and
    /// last-login refreshed.
    async fn upsert_by_email(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError>;

    /// Set-insert into the user's joined events; repeating it is a no-op.
    async fn add_joined_event(&self, user_id: Uuid, event_id: Uuid) -> Result<(), AppError>;

    /// Drop a deleted event from every user's joined set.
    async fn forget_event(&self, event_id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn upsert_by_email(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, AppError> {
        // The unique index on email makes concurrent first logins converge on one row.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, picture, joined_events, created_at, last_login)
            VALUES ($1, $2, $3, $4, '{}', now(), now())
            ON CONFLICT (email) DO UPDATE
                SET name = EXCLUDED.name,
                    picture = EXCLUDED.picture,
                    last_login = now()
            RETURNING id, email, name, picture, joined_events, created_at, last_login
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(picture)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, picture, joined_events, created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("user"))
    }

    async fn add_joined_event(&self, user_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
        let exists: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE users
               SET joined_events = CASE
                       WHEN $2 = ANY(joined_events) THEN joined_events
                       ELSE array_append(joined_events, $2)
                   END
             WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.db)
        .await?;
        exists.map(|_| ()).ok_or(AppError::NotFound("user"))
    }

    async fn forget_event(&self, event_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
               SET joined_events = array_remove(joined_events, $1)
             WHERE $1 = ANY(joined_events)
            "#,
        )
        .bind(event_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::db::tests::pool;

    fn unique_email() -> String {
        format!("{}@test.example", Uuid::new_v4())
    }

    #[tokio::test]
    async fn concurrent_upserts_share_one_row() {
        let Some(db) = pool().await else { return };
        let store = PgUserStore::new(db);
        let email = unique_email();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let email = email.clone();
            tasks.push(tokio::spawn(async move {
                store.upsert_by_email(&email, &format!("N{i}"), None).await
            }));
        }
        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap().unwrap().id);
        }
        assert_eq!(ids.len(), 1);

        let again = store.upsert_by_email(&email, "Renamed", Some("p.png")).await.unwrap();
        assert!(ids.contains(&again.id));
        assert_eq!(again.name, "Renamed");
        assert_eq!(again.picture.as_deref(), Some("p.png"));
    }

    #[tokio::test]
    async fn joined_events_are_a_set() {
        let Some(db) = pool().await else { return };
        let store = PgUserStore::new(db);
        let user = store.upsert_by_email(&unique_email(), "A", None).await.unwrap();
        let event_id = Uuid::new_v4();

        store.add_joined_event(user.id, event_id).await.unwrap();
        store.add_joined_event(user.id, event_id).await.unwrap();
        assert_eq!(store.find_by_id(user.id).await.unwrap().joined_events, vec![event_id]);

        store.forget_event(event_id).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().joined_events.is_empty());

        assert!(matches!(
            store.add_joined_event(Uuid::new_v4(), event_id).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(
            store.find_by_id(Uuid::new_v4()).await,
            Err(AppError::NotFound("user"))
        ));
    }
}
