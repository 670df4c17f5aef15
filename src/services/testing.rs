//! Service wiring over in-memory stores and recording fakes.

use chrono::{Duration, Utc};
use std::sync::Arc;

use super::{AuthService, DrawService, EventService, GiftService};
use crate::external::AssetFolders;
use crate::external::fakes::{RecordingAssetStore, RecordingMailer};
use crate::models::{CreateEventRequest, EventType, NewAccount};
use crate::store::AccountStore;
use crate::store::memory::{MemoryAccountStore, MemoryEventStore};
use crate::utils::{JwtService, email_local_part};

pub struct Harness {
    pub event_service: EventService,
    pub draw_service: DrawService,
    pub gift_service: GiftService,
    pub auth_service: AuthService,
    pub events: Arc<MemoryEventStore>,
    pub accounts: Arc<MemoryAccountStore>,
    pub mailer: Arc<RecordingMailer>,
    pub assets: Arc<RecordingAssetStore>,
}

pub fn harness() -> Harness {
    let events = Arc::new(MemoryEventStore::default());
    let accounts = Arc::new(MemoryAccountStore::default());
    let mailer = Arc::new(RecordingMailer::default());
    let assets = Arc::new(RecordingAssetStore::default());
    let folders = AssetFolders::new("giftboard");

    Harness {
        event_service: EventService::new(
            events.clone(),
            accounts.clone(),
            mailer.clone(),
            assets.clone(),
            folders.clone(),
            "https://app.example.com".to_string(),
        ),
        draw_service: DrawService::new(events.clone(), accounts.clone()),
        gift_service: GiftService::new(events.clone(), assets.clone(), folders),
        auth_service: AuthService::new(
            accounts.clone(),
            events.clone(),
            JwtService::new("test-secret", 3600, 7200),
        ),
        events,
        accounts,
        mailer,
        assets,
    }
}

/// Creates an account directly in the store, without password.
pub async fn register(accounts: &MemoryAccountStore, email: &str) -> i64 {
    accounts
        .insert(NewAccount {
            email: email.to_string(),
            firstname: "Test".to_string(),
            lastname: "User".to_string(),
            nickname: email_local_part(email).to_string(),
            password_hash: String::new(),
        })
        .await
        .unwrap()
        .id
}

pub fn request(event_type: EventType) -> CreateEventRequest {
    CreateEventRequest {
        event_type,
        name: "Gift exchange".to_string(),
        description: Some("Bring joy".to_string()),
        date: Utc::now() + Duration::days(20),
        budget: Some(30.0),
    }
}

/// Invitation emails are sent from spawned tasks.
pub async fn wait_for_mail(mailer: &RecordingMailer, count: usize) {
    for _ in 0..50 {
        if mailer.sent().len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
}
