//! In-process stores used by the service tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use uuid::Uuid;

use super::{AccountStore, EventStore};
use crate::error::{AppError, AppResult};
use crate::models::{Account, Event, NewAccount};

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<Uuid, Event>>,
    forced_failures: AtomicUsize,
}

impl MemoryEventStore {
    /// Makes the next `n` conditional saves report a lost race.
    pub fn fail_next_saves(&self, n: usize) {
        self.forced_failures.store(n, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        let found = self.events.lock().unwrap().get(&id).cloned();
        // interleave concurrent tasks between read and write
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn insert(&self, event: &mut Event) -> AppResult<()> {
        event.version = 1;
        self.events.lock().unwrap().insert(event.id, event.clone());
        Ok(())
    }

    async fn save_if_unchanged(&self, event: &mut Event) -> AppResult<bool> {
        if self
            .forced_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(false);
        }

        let mut events = self.events.lock().unwrap();
        match events.get(&event.id) {
            Some(stored) if stored.version == event.version => {
                event.version += 1;
                events.insert(event.id, event.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.events.lock().unwrap().remove(&id).is_some())
    }

    async fn find_by_participant_email(&self, email: &str) -> AppResult<Vec<Event>> {
        let mut found: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.participants.get(email).is_some())
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
    next_id: AtomicI64,
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let email = crate::utils::normalize_email(email);
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_nickname(&self, nickname: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.nickname == nickname)
            .cloned())
    }

    async fn insert(&self, account: NewAccount) -> AppResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        check_unique(&accounts, None, &account.email, &account.nickname)?;
        let account = Account {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: account.email,
            firstname: account.firstname,
            lastname: account.lastname,
            nickname: account.nickname,
            password_hash: account.password_hash,
            created_at: Utc::now(),
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> AppResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        check_unique(&accounts, Some(account.id), &account.email, &account.nickname)?;
        let stored = accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        stored.email = account.email.clone();
        stored.firstname = account.firstname.clone();
        stored.lastname = account.lastname.clone();
        stored.nickname = account.nickname.clone();
        Ok(stored.clone())
    }
}

/// Mirrors the unique indexes on `accounts.email` and `accounts.nickname`.
fn check_unique(accounts: &[Account], id: Option<i64>, email: &str, nickname: &str) -> AppResult<()> {
    let others = || accounts.iter().filter(|a| Some(a.id) != id);
    if others().any(|a| a.email == email) {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    if others().any(|a| a.nickname == nickname) {
        return Err(AppError::Conflict("Nickname already taken".to_string()));
    }
    Ok(())
}
