//! Persistence seams for accounts and event documents.
//!
//! Services only see the traits below; `db` implements them on sea-orm and
//! `memory` provides in-process versions for tests.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Account, Event, NewAccount};

pub mod db;
#[cfg(test)]
pub mod memory;

pub use db::{DbAccountStore, DbEventStore};

/// Attempts made by [`mutate_event`] before giving up on a contended event.
pub const MAX_SAVE_ATTEMPTS: usize = 5;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// Stores a new event with version 1.
    async fn insert(&self, event: &mut Event) -> AppResult<()>;

    /// Writes `event` only if the stored version still equals
    /// `event.version`. On success the version is bumped in place and
    /// `true` is returned; `false` means someone else saved first.
    async fn save_if_unchanged(&self, event: &mut Event) -> AppResult<bool>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Events whose roster contains `email`, newest first.
    async fn find_by_participant_email(&self, email: &str) -> AppResult<Vec<Event>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Exact match; nicknames are unique like emails.
    async fn find_by_nickname(&self, nickname: &str) -> AppResult<Option<Account>>;

    /// Fails with `Conflict` when the email or the nickname is taken.
    async fn insert(&self, account: NewAccount) -> AppResult<Account>;

    /// Writes the profile fields of `account`. Same `Conflict` rule as `insert`.
    async fn update(&self, account: &Account) -> AppResult<Account>;
}

pub type SharedEventStore = Arc<dyn EventStore>;
pub type SharedAccountStore = Arc<dyn AccountStore>;

/// Load-modify-save loop over one event document.
///
/// `apply` runs against a fresh copy on every attempt, so it must be free of
/// side effects outside the event. An error from `apply` aborts without
/// saving. A lost race reloads and retries up to [`MAX_SAVE_ATTEMPTS`] times.
pub async fn mutate_event<T, F>(store: &dyn EventStore, id: Uuid, mut apply: F) -> AppResult<(Event, T)>
where
    F: FnMut(&mut Event) -> AppResult<T> + Send,
    T: Send,
{
    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let mut event = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let output = apply(&mut event)?;
        event.updated_at = chrono::Utc::now();

        if store.save_if_unchanged(&mut event).await? {
            return Ok((event, output));
        }
        log::warn!("Concurrent update on event {id}, attempt {attempt}/{MAX_SAVE_ATTEMPTS}");
    }

    Err(AppError::Conflict(
        "The event is being modified, please retry".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryEventStore;
    use super::*;
    use crate::models::{CreateEventRequest, EventType};
    use chrono::{Duration, Utc};

    fn organizer() -> Account {
        Account {
            id: 1,
            email: "org@example.com".to_string(),
            firstname: "Olga".to_string(),
            lastname: "Organizer".to_string(),
            nickname: "olga".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    async fn stored_event(store: &MemoryEventStore) -> Event {
        let request = CreateEventRequest {
            event_type: EventType::ChristmasList,
            name: "Family".to_string(),
            description: None,
            date: Utc::now() + Duration::days(10),
            budget: None,
        };
        let mut event = Event::create(request, &organizer(), Utc::now()).unwrap();
        store.insert(&mut event).await.unwrap();
        event
    }

    #[tokio::test]
    async fn test_mutate_event_saves_and_bumps_version() {
        let store = MemoryEventStore::default();
        let event = stored_event(&store).await;
        assert_eq!(event.version, 1);

        let (saved, len) = mutate_event(&store, event.id, |e| {
            e.invite(1, "p1@example.com", None, Utc::now())?;
            Ok(e.participants.len())
        })
        .await
        .unwrap();
        assert_eq!(len, 2);
        assert_eq!(saved.version, 2);
        assert_eq!(store.find_by_id(event.id).await.unwrap().unwrap(), saved);
    }

    #[tokio::test]
    async fn test_mutate_event_error_does_not_save() {
        let store = MemoryEventStore::default();
        let event = stored_event(&store).await;

        let err = mutate_event(&store, event.id, |e| e.invite(2, "p1@example.com", None, Utc::now()).map(|_| ()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(store.find_by_id(event.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_mutate_event_unknown_id() {
        let store = MemoryEventStore::default();
        let err = mutate_event(&store, Uuid::new_v4(), |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_save_is_refused() {
        let store = MemoryEventStore::default();
        let event = stored_event(&store).await;

        let mut first = event.clone();
        let mut second = event;
        assert!(store.save_if_unchanged(&mut first).await.unwrap());
        assert!(!store.save_if_unchanged(&mut second).await.unwrap());
        assert_eq!(second.version, 1);
    }

    #[tokio::test]
    async fn test_mutate_event_gives_up_when_always_contended() {
        let store = MemoryEventStore::default();
        let event = stored_event(&store).await;
        store.fail_next_saves(MAX_SAVE_ATTEMPTS);

        let err = mutate_event(&store, event.id, |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
