use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AccountSummary, AssignmentResponse, Capability, EventResponse};
use crate::services::load_account;
use crate::store::{SharedAccountStore, SharedEventStore, mutate_event};

#[derive(Clone)]
pub struct DrawService {
    events: SharedEventStore,
    accounts: SharedAccountStore,
}

impl DrawService {
    pub fn new(events: SharedEventStore, accounts: SharedAccountStore) -> Self {
        Self { events, accounts }
    }

    /// Assigns every accepted participant a receiver. At most one draw ever
    /// commits per event: a concurrent second request reloads the drawn
    /// document and fails with `AlreadyDrawn`.
    pub async fn perform_draw(&self, account_id: i64, event_id: Uuid) -> AppResult<EventResponse> {
        let (event, _) = mutate_event(self.events.as_ref(), event_id, |e| {
            let mut rng = rand::thread_rng();
            e.draw(account_id, &mut rng, Utc::now())
        })
        .await?;

        let drawn = event
            .participants
            .iter()
            .filter(|p| p.assigned_to.is_some())
            .count();
        log::info!("Draw performed for event {} ({} participants)", event_id, drawn);
        Ok(EventResponse::for_viewer(&event, account_id))
    }

    /// The receiver of the requester's gift, with their wish list.
    pub async fn my_assignment(
        &self,
        account_id: i64,
        event_id: Uuid,
    ) -> AppResult<AssignmentResponse> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        event.event_type.require(Capability::Draw)?;

        let receiver_id = event.assignment_for(&account)?;
        let receiver = self
            .accounts
            .find_by_id(receiver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assigned account no longer exists".to_string()))?;
        let wish_list = event
            .participants
            .by_account(receiver_id)
            .map(|p| p.wish_list.clone())
            .unwrap_or_default();

        Ok(AssignmentResponse {
            event_id,
            receiver: AccountSummary::from(&receiver),
            wish_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, InvitationResponse};
    use crate::services::InviteRequest;
    use crate::services::testing::{Harness, harness, register, request};
    use crate::store::EventStore;
    use crate::utils::is_derangement;
    use std::collections::HashMap;

    /// Event with the organizer plus `guests` accepted participants.
    async fn event_with_guests(h: &Harness, guests: usize) -> (i64, Uuid, Vec<i64>) {
        let org = register(&h.accounts, "org@example.com").await;
        let event = h
            .event_service
            .create_event(org, request(EventType::SecretSanta))
            .await
            .unwrap();
        let mut ids = vec![org];
        for i in 0..guests {
            let email = format!("guest{i}@example.com");
            let id = register(&h.accounts, &email).await;
            h.event_service
                .invite(org, event.id, InviteRequest { email })
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
    async fn test_four_participants_draw_end_to_end() {
        let h = harness();
        let (org, event_id, ids) = event_with_guests(&h, 3).await;

        h.draw_service.perform_draw(org, event_id).await.unwrap();

        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert!(event.is_drawn());
        let position: HashMap<i64, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let perm: Vec<usize> = ids
            .iter()
            .map(|id| {
                let p = event.participants.by_account(*id).unwrap();
                position[&p.assigned_to.unwrap()]
            })
            .collect();
        assert!(is_derangement(&perm));

        for id in &ids {
            let assignment = h.draw_service.my_assignment(*id, event_id).await.unwrap();
            assert_ne!(assignment.receiver.id, *id);
            let receiver = event.participants.by_account(assignment.receiver.id).unwrap();
            assert_eq!(receiver.assigned_by, Some(*id));
        }
    }

    #[tokio::test]
    async fn test_draw_needs_two_accepted() {
        let h = harness();
        let (org, event_id, _) = event_with_guests(&h, 0).await;
        h.event_service
            .invite(org, event_id, InviteRequest { email: "late@example.com".into() })
            .await
            .unwrap();

        assert!(matches!(
            h.draw_service.perform_draw(org, event_id).await,
            Err(AppError::InsufficientParticipants)
        ));
        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert!(!event.is_drawn());
        assert!(matches!(
            h.draw_service.my_assignment(org, event_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_organizer_draws_once() {
        let h = harness();
        let (org, event_id, ids) = event_with_guests(&h, 2).await;

        assert!(matches!(
            h.draw_service.perform_draw(ids[1], event_id).await,
            Err(AppError::Forbidden(_))
        ));
        h.draw_service.perform_draw(org, event_id).await.unwrap();
        let first = h.events.find_by_id(event_id).await.unwrap().unwrap();

        assert!(matches!(
            h.draw_service.perform_draw(org, event_id).await,
            Err(AppError::AlreadyDrawn)
        ));
        let second = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_draws_commit_once() {
        let h = harness();
        let (org, event_id, _) = event_with_guests(&h, 4).await;
        let before = h.events.find_by_id(event_id).await.unwrap().unwrap().version;

        let (a, b) = tokio::join!(
            h.draw_service.perform_draw(org, event_id),
            h.draw_service.perform_draw(org, event_id)
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(AppError::AlreadyDrawn)))
        );

        let event = h.events.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.version, before + 1);
    }

    #[tokio::test]
    async fn test_birthday_events_have_no_draw() {
        let h = harness();
        let org = register(&h.accounts, "org@example.com").await;
        let event = h
            .event_service
            .create_event(org, request(EventType::Birthday))
            .await
            .unwrap();
        assert!(matches!(
            h.draw_service.perform_draw(org, event.id).await,
            Err(AppError::InvalidEventType(_))
        ));
        assert!(matches!(
            h.draw_service.my_assignment(org, event.id).await,
            Err(AppError::InvalidEventType(_))
        ));
    }
}
