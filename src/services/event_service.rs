use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{AssetFolders, AssetStore, Mailer, invitation_email};
use crate::models::{
    CreateEventRequest, Event, EventResponse, InvitationResponse, UpdateEventRequest,
};
use crate::services::load_account;
use crate::store::{SharedAccountStore, SharedEventStore, mutate_event};
use crate::utils::validate_email;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteRequest {
    #[schema(example = "friend@example.com")]
    pub email: String,
}

#[derive(Clone)]
pub struct EventService {
    events: SharedEventStore,
    accounts: SharedAccountStore,
    mailer: Arc<dyn Mailer>,
    assets: Arc<dyn AssetStore>,
    folders: AssetFolders,
    app_url: String,
}

impl EventService {
    pub fn new(
        events: SharedEventStore,
        accounts: SharedAccountStore,
        mailer: Arc<dyn Mailer>,
        assets: Arc<dyn AssetStore>,
        folders: AssetFolders,
        app_url: String,
    ) -> Self {
        Self {
            events,
            accounts,
            mailer,
            assets,
            folders,
            app_url,
        }
    }

    async fn find(&self, event_id: Uuid) -> AppResult<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn create_event(
        &self,
        account_id: i64,
        request: CreateEventRequest,
    ) -> AppResult<EventResponse> {
        let organizer = load_account(self.accounts.as_ref(), account_id).await?;
        let mut event = Event::create(request, &organizer, Utc::now())?;
        self.events.insert(&mut event).await?;

        log::info!(
            "Event {} ({}) created by account {}",
            event.id,
            event.event_type,
            account_id
        );
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    /// Events the account is on the roster of, whatever its status.
    pub async fn list_events(&self, account_id: i64) -> AppResult<Vec<EventResponse>> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        let events = self.events.find_by_participant_email(&account.email).await?;
        Ok(events
            .iter()
            .map(|e| EventResponse::for_viewer(e, account_id))
            .collect())
    }

    pub async fn get_event(&self, account_id: i64, event_id: Uuid) -> AppResult<EventResponse> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        let event = self.find(event_id).await?;
        event.member(&account)?;
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    pub async fn update_event(
        &self,
        account_id: i64,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> AppResult<EventResponse> {
        let (event, _) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.update(account_id, request.clone(), Utc::now())
        })
        .await?;
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    pub async fn delete_event(&self, account_id: i64, event_id: Uuid) -> AppResult<()> {
        let event = self.find(event_id).await?;
        event.ensure_organizer(account_id)?;
        if !self.events.delete(event_id).await? {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        log::info!("Event {} deleted by account {}", event_id, account_id);

        for folder in self.folders.for_event(&event) {
            if let Err(e) = self.assets.delete_folder(&folder).await {
                log::warn!("Failed to delete asset folder {}: {}", folder, e);
            }
        }
        Ok(())
    }

    pub async fn invite(
        &self,
        account_id: i64,
        event_id: Uuid,
        request: InviteRequest,
    ) -> AppResult<EventResponse> {
        let email = validate_email(&request.email)?;
        let invitee = self.accounts.find_by_email(&email).await?;
        let invitee_id = invitee.as_ref().map(|a| a.id);

        let (event, _) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.invite(account_id, &email, invitee_id, Utc::now())
                .map(|_| ())
        })
        .await?;
        log::info!("Invitation to event {} sent to {}", event_id, email);

        // A failed email never undoes the invitation
        let message = invitation_email(&event, &email, invitee.as_ref(), &self.app_url);
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(message).await {
                log::warn!("Failed to send invitation email: {}", e);
            }
        });

        Ok(EventResponse::for_viewer(&event, account_id))
    }

    pub async fn respond(
        &self,
        account_id: i64,
        event_id: Uuid,
        response: InvitationResponse,
    ) -> AppResult<EventResponse> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        let (event, _) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.respond(&account.email, response, account.id)
        })
        .await?;

        log::info!(
            "Account {} answered {:?} to event {}",
            account_id,
            response,
            event_id
        );
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    pub async fn remove_participant(
        &self,
        account_id: i64,
        event_id: Uuid,
        email: &str,
    ) -> AppResult<EventResponse> {
        let (event, removed) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.remove_participant(account_id, email)
        })
        .await?;
        log::info!("{} removed from event {}", removed.email, event_id);

        self.release_wish_list_images(&removed.wish_list).await;
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    pub async fn leave(&self, account_id: i64, event_id: Uuid) -> AppResult<()> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        let (_, removed) =
            mutate_event(self.events.as_ref(), event_id, |e| e.leave(&account)).await?;
        log::info!("Account {} left event {}", account_id, event_id);

        self.release_wish_list_images(&removed.wish_list).await;
        Ok(())
    }

    async fn release_wish_list_images(&self, gifts: &[crate::models::Gift]) {
        for image in gifts.iter().flat_map(|g| g.images.iter()) {
            if let Err(e) = self.assets.delete(image).await {
                log::warn!("Failed to delete image {}: {}", image.public_id, e);
            }
        }
    }
}
