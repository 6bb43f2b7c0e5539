//! Process-local stores for development runs without `DATABASE_URL` and
//! for tests. One mutex covers users and events; it is never held across
//! an `.await`.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{repo::UserStore, repo_types::User},
    error::AppError,
    events::{
        repo::EventStore,
        repo_types::{Comment, Event, NewEvent},
    },
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
    events: Vec<Event>, // insertion order
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Storage(anyhow::anyhow!("memory store lock poisoned")))
    }

    #[cfg(test)]
    pub fn user_count(&self) -> usize {
        self.inner.lock().map(|g| g.users.len()).unwrap_or_default()
    }
}

fn set_insert(set: &mut Vec<Uuid>, id: Uuid) {
    if !set.contains(&id) {
        set.push(id);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_by_email(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, AppError> {
        let mut g = self.lock()?;
        let now = OffsetDateTime::now_utc();
        if let Some(id) = g.by_email.get(email).copied() {
            let user = g
                .users
                .get_mut(&id)
                .ok_or_else(|| AppError::Storage(anyhow::anyhow!("email index out of sync")))?;
            user.name = name.to_string();
            user.picture = picture.map(str::to_string);
            user.last_login = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            picture: picture.map(str::to_string),
            joined_events: Vec::new(),
            created_at: now,
            last_login: now,
        };
        g.by_email.insert(user.email.clone(), user.id);
        g.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError> {
        self.lock()?
            .users
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound("user"))
    }

    async fn add_joined_event(&self, user_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
        let mut g = self.lock()?;
        let user = g.users.get_mut(&user_id).ok_or(AppError::NotFound("user"))?;
        set_insert(&mut user.joined_events, event_id);
        Ok(())
    }

    async fn forget_event(&self, event_id: Uuid) -> Result<(), AppError> {
        let mut g = self.lock()?;
        for user in g.users.values_mut() {
            user.joined_events.retain(|id| *id != event_id);
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let mut events = self.lock()?.events.clone();
        // stable: equal dates keep creation order
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn get(&self, id: Uuid) -> Result<Event, AppError> {
        self.lock()?
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(AppError::NotFound("event"))
    }

    async fn create(
        &self,
        creator_id: Uuid,
        creator_name: &str,
        event: NewEvent,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        self.lock()?.events.push(Event {
            id,
            title: event.title,
            date: event.date,
            time: event.time,
            location: event.location,
            category: event.category,
            description: event.description,
            creator_id,
            creator_name: creator_name.to_string(),
            image: event.image,
            attendees: Vec::new(),
            comments: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut g = self.lock()?;
        let event = g
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(AppError::NotFound("event"))?;
        set_insert(&mut event.attendees, user_id);
        Ok(())
    }

    async fn push_comment(&self, event_id: Uuid, comment: Comment) -> Result<(), AppError> {
        let mut g = self.lock()?;
        let event = g
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(AppError::NotFound("event"))?;
        event.comments.push(comment);
        Ok(())
    }

    async fn delete_comment(
        &self,
        event_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<(), AppError> {
        let mut g = self.lock()?;
        let event = g
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(AppError::Forbidden)?;
        let before = event.comments.len();
        event
            .comments
            .retain(|c| !(c.id == comment_id && c.author_id == author_id));
        if event.comments.len() == before {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    async fn delete(&self, event_id: Uuid, caller_id: Uuid) -> Result<(), AppError> {
        let mut g = self.lock()?;
        let idx = g
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or(AppError::NotFound("event"))?;
        if g.events[idx].creator_id != caller_id {
            return Err(AppError::Forbidden);
        }
        g.events.remove(idx);
        Ok(())
    }
}
