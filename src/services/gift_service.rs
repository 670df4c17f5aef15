use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{AssetFolders, AssetStore};
use crate::models::{AssetRef, DecodedImage, Event, Gift, GiftRequest};
use crate::store::{SharedEventStore, mutate_event};

/// Which list of an event a gift belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiftList {
    /// The organizer-managed list of a birthday event.
    Event,
    /// The requester's own wish list.
    Wishes,
}

fn locate(event: &Event, list: GiftList, account_id: i64, gift_id: Uuid) -> AppResult<Gift> {
    let gifts = match list {
        GiftList::Event => Some(&event.gift_list),
        GiftList::Wishes => event.participants.by_account(account_id).map(|p| &p.wish_list),
    };
    gifts
        .and_then(|g| g.iter().find(|g| g.id == gift_id))
        .cloned()
        .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))
}

#[derive(Clone)]
pub struct GiftService {
    events: SharedEventStore,
    assets: Arc<dyn AssetStore>,
    folders: AssetFolders,
}

impl GiftService {
    pub fn new(events: SharedEventStore, assets: Arc<dyn AssetStore>, folders: AssetFolders) -> Self {
        Self {
            events,
            assets,
            folders,
        }
    }

    /// Permission check done before anything is uploaded; the mutation
    /// repeats it against the committed document.
    async fn check_editor(&self, list: GiftList, account_id: i64, event_id: Uuid) -> AppResult<String> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        match list {
            GiftList::Event => {
                event.ensure_gift_list_editor(account_id)?;
                Ok(self.folders.gift_list(event_id))
            }
            GiftList::Wishes => {
                event.ensure_wish_list_owner(account_id)?;
                Ok(self.folders.wish_list(event_id, account_id))
            }
        }
    }

    async fn upload_all(&self, folder: &str, images: &[DecodedImage]) -> AppResult<Vec<AssetRef>> {
        let mut uploaded = Vec::with_capacity(images.len());
        for image in images {
            match self.assets.store(folder, image).await {
                Ok(asset) => uploaded.push(asset),
                Err(e) => {
                    self.release(&uploaded).await;
                    return Err(e);
                }
            }
        }
        Ok(uploaded)
    }

    /// Best-effort deletion; failures only leave orphaned files behind.
    async fn release(&self, assets: &[AssetRef]) {
        for asset in assets {
            if let Err(e) = self.assets.delete(asset).await {
                log::warn!("Failed to delete image {}: {}", asset.public_id, e);
            }
        }
    }

    pub async fn add_gift(
        &self,
        list: GiftList,
        account_id: i64,
        event_id: Uuid,
        request: GiftRequest,
    ) -> AppResult<Gift> {
        let (details, images) = request.into_parts()?;
        if images.is_empty() {
            return Err(AppError::ValidationError(
                "At least one image is required".to_string(),
            ));
        }
        let folder = self.check_editor(list, account_id, event_id).await?;
        let uploaded = self.upload_all(&folder, &images).await?;

        let result = mutate_event(self.events.as_ref(), event_id, |e| {
            let gift = Gift::new(details.clone(), uploaded.clone(), Some(account_id), Utc::now());
            match list {
                GiftList::Event => e.add_gift(account_id, gift).cloned(),
                GiftList::Wishes => e.add_wish(account_id, gift).cloned(),
            }
        })
        .await;

        match result {
            Ok((_, gift)) => {
                log::info!("Gift {} added to event {} ({:?})", gift.id, event_id, list);
                Ok(gift)
            }
            Err(e) => {
                self.release(&uploaded).await;
                Err(e)
            }
        }
    }

    /// Without images in the request the current images are kept.
    pub async fn update_gift(
        &self,
        list: GiftList,
        account_id: i64,
        event_id: Uuid,
        gift_id: Uuid,
        request: GiftRequest,
    ) -> AppResult<Gift> {
        let (details, images) = request.into_parts()?;
        let folder = self.check_editor(list, account_id, event_id).await?;
        let uploaded = if images.is_empty() {
            None
        } else {
            Some(self.upload_all(&folder, &images).await?)
        };

        let result = mutate_event(self.events.as_ref(), event_id, |e| {
            let released = match list {
                GiftList::Event => {
                    e.update_gift(account_id, gift_id, details.clone(), uploaded.clone())?
                }
                GiftList::Wishes => {
                    e.update_wish(account_id, gift_id, details.clone(), uploaded.clone())?
                }
            };
            Ok((released, locate(e, list, account_id, gift_id)?))
        })
        .await;

        match result {
            Ok((_, (released, gift))) => {
                self.release(&released).await;
                Ok(gift)
            }
            Err(e) => {
                if let Some(uploaded) = &uploaded {
                    self.release(uploaded).await;
                }
                Err(e)
            }
        }
    }

    pub async fn delete_gift(
        &self,
        list: GiftList,
        account_id: i64,
        event_id: Uuid,
        gift_id: Uuid,
    ) -> AppResult<()> {
        let (_, removed) = mutate_event(self.events.as_ref(), event_id, |e| match list {
            GiftList::Event => e.remove_gift(account_id, gift_id),
            GiftList::Wishes => e.remove_wish(account_id, gift_id),
        })
        .await?;
        log::info!("Gift {} removed from event {}", gift_id, event_id);

        self.release(&removed.images).await;
        Ok(())
    }

    /// "I will buy this" on a birthday gift list entry.
    pub async fn claim_gift(&self, account_id: i64, event_id: Uuid, gift_id: Uuid) -> AppResult<Gift> {
        let (_, gift) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.claim_gift(account_id, gift_id)?;
            locate(e, GiftList::Event, account_id, gift_id)
        })
        .await?;
        log::info!("Gift {} of event {} claimed by account {}", gift_id, event_id, account_id);
        Ok(gift)
    }

    /// "I will buy this" on another participant's wish list.
    pub async fn claim_wish(
        &self,
        account_id: i64,
        event_id: Uuid,
        owner_email: &str,
        gift_id: Uuid,
    ) -> AppResult<Gift> {
        let (_, gift) = mutate_event(self.events.as_ref(), event_id, |e| {
            e.claim_wish(account_id, owner_email, gift_id)?;
            let owner_id = e
                .participants
                .get(owner_email)
                .and_then(|p| p.account_id)
                .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;
            locate(e, GiftList::Wishes, owner_id, gift_id)
        })
        .await?;
        log::info!("Wish {} of event {} claimed by account {}", gift_id, event_id, account_id);
        Ok(gift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, ImageUpload, InvitationResponse};
    use crate::services::InviteRequest;
    use crate::services::testing::{Harness, harness, register, request};
    use crate::store::EventStore;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::sync::atomic::Ordering;

    fn gift_request(name: &str, images: usize) -> GiftRequest {
        GiftRequest {
            name: name.to_string(),
            description: None,
            price: 19.99,
            url: None,
            images: (0..images)
                .map(|i| ImageUpload {
                    mime_type: "image/png".to_string(),
                    data: STANDARD.encode([i as u8, 1, 2]),
                })
                .collect(),
        }
    }

    async fn event_with(h: &Harness, event_type: EventType, guests: &[&str]) -> (i64, Uuid, Vec<i64>) {
        let org = register(&h.accounts, "org@example.com").await;
        let event = h
            .event_service
            .create_event(org, request(event_type))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for email in guests {
            let id = register(&h.accounts, email).await;
            h.event_service
                .invite(org, event.id, InviteRequest { email: email.to_string() })
                .await
                .unwrap();
            h.event_service
                .respond(id, event.id, InvitationResponse::Accept)
                .await
                .unwrap();
            ids.push(id);
        }
        (org, event.id, ids)
    }

    #[tokio::test]
    async fn test_gift_list_lifecycle_manages_images() {
        let h = harness();
        let (org, event_id, _) = event_with(&h, EventType::Birthday, &[]).await;

        assert!(matches!(
            h.gift_service
                .add_gift(GiftList::Event, org, event_id, gift_request("Kite", 0))
                .await,
            Err(AppError::ValidationError(_))
        ));

        let gift = h
            .gift_service
            .add_gift(GiftList::Event, org, event_id, gift_request("Kite", 2))
            .await
            .unwrap();
        assert_eq!(gift.images.len(), 2);
        let stored = h.assets.stored();
        assert!(stored.iter().all(|(folder, _)| *folder == format!("giftboard/gift-list/{event_id}")));

        // No images in the request: keep the current ones
        let kept = h
            .gift_service
            .update_gift(GiftList::Event, org, event_id, gift.id, gift_request("Big kite", 0))
            .await
            .unwrap();
        assert_eq!(kept.name, "Big kite");
        assert_eq!(kept.images, gift.images);
        assert!(h.assets.deleted().is_empty());

        let replaced = h
            .gift_service
            .update_gift(GiftList::Event, org, event_id, gift.id, gift_request("Big kite", 1))
            .await
            .unwrap();
        assert_eq!(replaced.images.len(), 1);
        let deleted = h.assets.deleted();
        assert_eq!(deleted.len(), 2);
        assert!(gift.images.iter().all(|i| deleted.contains(&i.public_id)));

        h.gift_service
            .delete_gift(GiftList::Event, org, event_id, gift.id)
            .await
            .unwrap();
        assert!(h.assets.deleted().contains(&replaced.images[0].public_id));
        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert!(event.gift_list.is_empty());
    }

    #[tokio::test]
    async fn test_refused_gift_uploads_nothing() {
        let h = harness();
        let (_, event_id, ids) =
            event_with(&h, EventType::Birthday, &["guest@example.com"]).await;

        assert!(matches!(
            h.gift_service
                .add_gift(GiftList::Event, ids[0], event_id, gift_request("Kite", 1))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.gift_service
                .add_gift(GiftList::Wishes, ids[0], event_id, gift_request("Kite", 1))
                .await,
            Err(AppError::InvalidEventType(_))
        ));
        assert!(h.assets.stored().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_reports_error() {
        let h = harness();
        let (org, event_id, _) = event_with(&h, EventType::Birthday, &[]).await;
        h.assets.fail_uploads.store(true, Ordering::SeqCst);

        assert!(matches!(
            h.gift_service
                .add_gift(GiftList::Event, org, event_id, gift_request("Kite", 1))
                .await,
            Err(AppError::ExternalApiError(_))
        ));
        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert!(event.gift_list.is_empty());
    }

    #[tokio::test]
    async fn test_wish_list_claims() {
        let h = harness();
        let (org, event_id, ids) =
            event_with(&h, EventType::ChristmasList, &["ann@example.com", "bob@example.com"]).await;
        let (ann, bob) = (ids[0], ids[1]);

        let wish = h
            .gift_service
            .add_gift(GiftList::Wishes, ann, event_id, gift_request("Scarf", 1))
            .await
            .unwrap();
        assert_eq!(
            h.assets.stored()[0].0,
            format!("giftboard/wish-list/{event_id}/{ann}")
        );

        assert!(matches!(
            h.gift_service.claim_wish(ann, event_id, "ann@example.com", wish.id).await,
            Err(AppError::Forbidden(_))
        ));
        let claimed = h
            .gift_service
            .claim_wish(bob, event_id, "ann@example.com", wish.id)
            .await
            .unwrap();
        assert_eq!(claimed.purchased_by, Some(bob));
        assert!(matches!(
            h.gift_service.claim_wish(org, event_id, "ann@example.com", wish.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            h.gift_service.claim_wish(org, event_id, "ann@example.com", Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));

        let outsider = register(&h.accounts, "out@example.com").await;
        assert!(matches!(
            h.gift_service.claim_wish(outsider, event_id, "ann@example.com", wish.id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let h = harness();
        let (org, event_id, ids) =
            event_with(&h, EventType::Birthday, &["ann@example.com", "bob@example.com"]).await;
        let gift = h
            .gift_service
            .add_gift(GiftList::Event, org, event_id, gift_request("Bike", 1))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            h.gift_service.claim_gift(ids[0], event_id, gift.id),
            h.gift_service.claim_gift(ids[1], event_id, gift.id)
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));

        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        let winner = event.gift_list[0].purchased_by.unwrap();
        assert!(ids.contains(&winner));
    }
}
