//! Event documents and the rules that apply to them.
//!
//! Everything here is pure: services load an [`Event`], call one of the
//! transitions below and persist the result with a conditional save.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Account, AccountSummary, AssetRef, Gift, GiftDetails, Participant, ParticipantRole,
    ParticipantStatus, Roster,
};
use crate::utils::derangement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SecretSanta,
    ChristmasList,
    Birthday,
}

/// Operations whose availability depends on the event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Draw,
    WishList,
    GiftList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub draw: bool,
    pub wish_list: bool,
    pub gift_list: bool,
    pub budget_required: bool,
}

impl EventType {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            EventType::SecretSanta => Capabilities {
                draw: true,
                wish_list: true,
                gift_list: false,
                budget_required: true,
            },
            EventType::ChristmasList => Capabilities {
                draw: false,
                wish_list: true,
                gift_list: false,
                budget_required: false,
            },
            EventType::Birthday => Capabilities {
                draw: false,
                wish_list: false,
                gift_list: true,
                budget_required: false,
            },
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        let caps = self.capabilities();
        match capability {
            Capability::Draw => caps.draw,
            Capability::WishList => caps.wish_list,
            Capability::GiftList => caps.gift_list,
        }
    }

    pub fn require(self, capability: Capability) -> AppResult<()> {
        if self.allows(capability) {
            return Ok(());
        }
        let message = match capability {
            Capability::Draw => "Only Secret Santa events have a draw",
            Capability::WishList => "Only Christmas list and Secret Santa events have wish lists",
            Capability::GiftList => "Only birthday events have a gift list",
        };
        Err(AppError::InvalidEventType(message.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::SecretSanta => "secret_santa",
            EventType::ChristmasList => "christmas_list",
            EventType::Birthday => "birthday",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvitationResponse {
    Accept,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub event_type: EventType,
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub budget: Option<f64>,
    pub organizer_id: i64,
    pub participants: Roster,
    /// Set exactly once by the draw, never cleared.
    pub drawn_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gift_list: Vec<Gift>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, owned by the store.
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub event_type: EventType,
    #[schema(example = "Office Secret Santa")]
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    #[schema(example = 20.0)]
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub event_type: Option<EventType>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub budget: Option<f64>,
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(2..=30).contains(&len) {
        return Err(AppError::ValidationError(
            "Event name must be between 2 and 30 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_budget(event_type: EventType, budget: Option<f64>) -> AppResult<Option<f64>> {
    if let Some(b) = budget
        && (!b.is_finite() || b < 0.0)
    {
        return Err(AppError::ValidationError(
            "Budget must be a positive amount".to_string(),
        ));
    }
    if event_type.capabilities().budget_required && budget.is_none_or(|b| b <= 0.0) {
        return Err(AppError::ValidationError(
            "A recommended budget is required for this event type".to_string(),
        ));
    }
    Ok(budget)
}

impl Event {
    /// New event whose roster holds only the organizer.
    pub fn create(
        request: CreateEventRequest,
        organizer: &Account,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = validate_name(&request.name)?;
        if request.date <= now {
            return Err(AppError::ValidationError(
                "The event date must be in the future".to_string(),
            ));
        }
        let budget = validate_budget(request.event_type, request.budget)?;

        Ok(Self {
            id: Uuid::new_v4(),
            event_type: request.event_type,
            name,
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            date: request.date,
            budget,
            organizer_id: organizer.id,
            participants: Roster::with_organizer(&organizer.email, organizer.id, now),
            drawn_at: None,
            gift_list: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn_at.is_some()
    }

    pub fn is_organizer(&self, account_id: i64) -> bool {
        self.organizer_id == account_id
    }

    pub fn ensure_organizer(&self, account_id: i64) -> AppResult<()> {
        if !self.is_organizer(account_id) {
            return Err(AppError::Forbidden(
                "Only the organizer can perform this action".to_string(),
            ));
        }
        Ok(())
    }

    /// The requester's own participant record, looked up by account and
    /// then by email for invitations not yet linked.
    pub fn member(&self, account: &Account) -> AppResult<&Participant> {
        self.participants
            .by_account(account.id)
            .or_else(|| self.participants.get(&account.email))
            .ok_or_else(|| AppError::Forbidden("You are not part of this event".to_string()))
    }

    fn accepted_member(&self, account_id: i64) -> AppResult<&Participant> {
        match self.participants.by_account(account_id) {
            Some(p) if p.is_eligible() => Ok(p),
            _ => Err(AppError::Forbidden(
                "You do not take part in this event".to_string(),
            )),
        }
    }

    pub fn update(
        &mut self,
        requester_id: i64,
        request: UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_organizer(requester_id)?;
        if request.date.is_some_and(|d| d <= now) {
            return Err(AppError::ValidationError(
                "The event date must be in the future".to_string(),
            ));
        }

        let event_type = match request.event_type {
            Some(t) if t != self.event_type => {
                let has_gifts = !self.gift_list.is_empty()
                    || self.participants.iter().any(|p| !p.wish_list.is_empty());
                if self.participants.len() > 1 || has_gifts {
                    return Err(AppError::Conflict(
                        "The event type cannot change once people were invited or gifts listed"
                            .to_string(),
                    ));
                }
                t
            }
            _ => self.event_type,
        };
        let name = match request.name {
            Some(n) => validate_name(&n)?,
            None => self.name.clone(),
        };
        let budget = validate_budget(event_type, request.budget.or(self.budget))?;

        self.event_type = event_type;
        self.name = name;
        self.budget = budget;
        if let Some(date) = request.date {
            self.date = date;
        }
        if let Some(description) = request.description {
            let description = description.trim().to_string();
            self.description = (!description.is_empty()).then_some(description);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Participation lifecycle
    // ---------------------------------------------------------------

    /// Adds an `invited` participant. `account_id` links an existing account
    /// registered with that email.
    pub fn invite(
        &mut self,
        requester_id: i64,
        email: &str,
        account_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<&Participant> {
        self.ensure_organizer(requester_id)?;
        if self.is_drawn() {
            return Err(AppError::AlreadyDrawn);
        }
        self.participants.push_invited(email, account_id, now)
    }

    /// Answers a pending invitation addressed to `email`.
    pub fn respond(
        &mut self,
        email: &str,
        response: InvitationResponse,
        account_id: i64,
    ) -> AppResult<()> {
        let drawn = self.is_drawn();
        let participant = match self.participants.get_mut(email) {
            Some(p) if p.status == ParticipantStatus::Invited => p,
            _ => {
                return Err(AppError::NotFound(
                    "No pending invitation for this email".to_string(),
                ));
            }
        };
        if drawn && response == InvitationResponse::Accept {
            return Err(AppError::AlreadyDrawn);
        }

        participant.status = match response {
            InvitationResponse::Accept => ParticipantStatus::Accepted,
            InvitationResponse::Decline => ParticipantStatus::Declined,
        };
        if participant.account_id.is_none() {
            participant.account_id = Some(account_id);
        }
        Ok(())
    }

    /// Organizer-initiated removal.
    pub fn remove_participant(&mut self, requester_id: i64, email: &str) -> AppResult<Participant> {
        self.ensure_organizer(requester_id)?;
        let index = self
            .participants
            .position(email)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;
        self.remove_at(index)
    }

    /// Voluntary removal of the requester's own record.
    pub fn leave(&mut self, account: &Account) -> AppResult<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.account_id == Some(account.id) || p.matches_email(&account.email))
            .ok_or_else(|| AppError::NotFound("You are not part of this event".to_string()))?;
        self.remove_at(index)
    }

    fn remove_at(&mut self, index: usize) -> AppResult<Participant> {
        let participant = self
            .participants
            .iter()
            .nth(index)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;
        if participant.role == ParticipantRole::Organizer {
            return Err(AppError::Forbidden(
                "The organizer cannot be removed from the event".to_string(),
            ));
        }
        // would leave a hole in the drawn cycle
        if self.is_drawn() && participant.is_eligible() {
            return Err(AppError::Conflict(
                "Participants of a completed draw cannot be removed".to_string(),
            ));
        }
        Ok(self.participants.remove_at(index))
    }

    // ---------------------------------------------------------------
    // Draw
    // ---------------------------------------------------------------

    /// Runs the Secret Santa draw over the accepted participants.
    ///
    /// Checks, in order: organizer, event type, at least two accepted
    /// participants, not drawn yet. On error the event is left untouched.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        requester_id: i64,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_organizer(requester_id)?;
        self.event_type.require(Capability::Draw)?;
        let eligible = self.participants.eligible_positions();
        if eligible.len() < 2 {
            return Err(AppError::InsufficientParticipants);
        }
        if self.is_drawn() {
            return Err(AppError::AlreadyDrawn);
        }

        let permutation = derangement(eligible.len(), rng);
        self.participants.apply_assignment(&eligible, &permutation);
        self.drawn_at = Some(now);
        Ok(())
    }

    /// Account the requester has to buy a gift for.
    pub fn assignment_for(&self, account: &Account) -> AppResult<i64> {
        let member = self.member(account)?;
        if !self.is_drawn() {
            return Err(AppError::NotFound("The draw has not been performed yet".to_string()));
        }
        member
            .assigned_to
            .ok_or_else(|| AppError::NotFound("You have no assignment in this draw".to_string()))
    }

    // ---------------------------------------------------------------
    // Gift list (birthday events)
    // ---------------------------------------------------------------

    pub fn ensure_gift_list_editor(&self, requester_id: i64) -> AppResult<()> {
        self.ensure_organizer(requester_id)?;
        self.event_type.require(Capability::GiftList)
    }

    pub fn add_gift(&mut self, requester_id: i64, gift: Gift) -> AppResult<&Gift> {
        self.ensure_gift_list_editor(requester_id)?;
        self.gift_list.push(gift);
        Ok(&self.gift_list[self.gift_list.len() - 1])
    }

    /// Returns the images released by the update.
    pub fn update_gift(
        &mut self,
        requester_id: i64,
        gift_id: Uuid,
        details: GiftDetails,
        images: Option<Vec<AssetRef>>,
    ) -> AppResult<Vec<AssetRef>> {
        self.ensure_gift_list_editor(requester_id)?;
        let gift = find_gift_mut(&mut self.gift_list, gift_id)?;
        Ok(gift.apply(details, images))
    }

    pub fn remove_gift(&mut self, requester_id: i64, gift_id: Uuid) -> AppResult<Gift> {
        self.ensure_gift_list_editor(requester_id)?;
        remove_gift(&mut self.gift_list, gift_id)
    }

    /// Any accepted participant, the organizer included, may claim a gift
    /// of the birthday list.
    pub fn claim_gift(&mut self, account_id: i64, gift_id: Uuid) -> AppResult<()> {
        self.event_type.require(Capability::GiftList)?;
        self.accepted_member(account_id)?;
        find_gift_mut(&mut self.gift_list, gift_id)?.claim(account_id)
    }

    // ---------------------------------------------------------------
    // Wish lists (Christmas list / Secret Santa events)
    // ---------------------------------------------------------------

    pub fn ensure_wish_list_owner(&self, account_id: i64) -> AppResult<()> {
        self.event_type.require(Capability::WishList)?;
        self.accepted_member(account_id).map(|_| ())
    }

    fn own_wish_list(&mut self, account_id: i64) -> AppResult<&mut Vec<Gift>> {
        self.ensure_wish_list_owner(account_id)?;
        self.participants
            .by_account_mut(account_id)
            .map(|p| &mut p.wish_list)
            .ok_or_else(|| AppError::Forbidden("You do not take part in this event".to_string()))
    }

    pub fn add_wish(&mut self, account_id: i64, gift: Gift) -> AppResult<&Gift> {
        let list = self.own_wish_list(account_id)?;
        list.push(gift);
        Ok(&list[list.len() - 1])
    }

    pub fn update_wish(
        &mut self,
        account_id: i64,
        gift_id: Uuid,
        details: GiftDetails,
        images: Option<Vec<AssetRef>>,
    ) -> AppResult<Vec<AssetRef>> {
        let list = self.own_wish_list(account_id)?;
        Ok(find_gift_mut(list, gift_id)?.apply(details, images))
    }

    pub fn remove_wish(&mut self, account_id: i64, gift_id: Uuid) -> AppResult<Gift> {
        let list = self.own_wish_list(account_id)?;
        remove_gift(list, gift_id)
    }

    /// Claims an entry of another participant's wish list.
    pub fn claim_wish(&mut self, account_id: i64, owner_email: &str, gift_id: Uuid) -> AppResult<()> {
        self.event_type.require(Capability::WishList)?;
        self.accepted_member(account_id)?;
        let owner = self
            .participants
            .get_mut(owner_email)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;
        if owner.account_id == Some(account_id) {
            return Err(AppError::Forbidden(
                "You cannot claim a gift from your own wish list".to_string(),
            ));
        }
        find_gift_mut(&mut owner.wish_list, gift_id)?.claim(account_id)
    }

    /// Every image referenced by the document.
    pub fn all_images(&self) -> Vec<AssetRef> {
        self.gift_list
            .iter()
            .chain(self.participants.iter().flat_map(|p| p.wish_list.iter()))
            .flat_map(|g| g.images.iter().cloned())
            .collect()
    }
}

fn find_gift_mut(list: &mut [Gift], gift_id: Uuid) -> AppResult<&mut Gift> {
    list.iter_mut()
        .find(|g| g.id == gift_id)
        .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))
}

fn remove_gift(list: &mut Vec<Gift>, gift_id: Uuid) -> AppResult<Gift> {
    let index = list
        .iter()
        .position(|g| g.id == gift_id)
        .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;
    Ok(list.remove(index))
}

// -------------------------------------------------------------------
// API views
// -------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantResponse {
    pub email: String,
    pub account_id: Option<i64>,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub wish_list: Vec<Gift>,
    /// Only present on the viewer's own record.
    pub assigned_to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub event_type: EventType,
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub budget: Option<f64>,
    pub organizer_id: i64,
    pub drawn: bool,
    pub drawn_at: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantResponse>,
    pub gift_list: Vec<Gift>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    /// Event as seen by `viewer_id`: the secret assignments of other
    /// participants, and who gives to the viewer, stay hidden.
    pub fn for_viewer(event: &Event, viewer_id: i64) -> Self {
        let participants = event
            .participants
            .iter()
            .map(|p| ParticipantResponse {
                email: p.email.clone(),
                account_id: p.account_id,
                role: p.role,
                status: p.status,
                joined_at: p.joined_at,
                wish_list: p.wish_list.clone(),
                assigned_to: if p.account_id == Some(viewer_id) {
                    p.assigned_to
                } else {
                    None
                },
            })
            .collect();

        Self {
            id: event.id,
            event_type: event.event_type,
            name: event.name.clone(),
            description: event.description.clone(),
            date: event.date,
            budget: event.budget,
            organizer_id: event.organizer_id,
            drawn: event.is_drawn(),
            drawn_at: event.drawn_at,
            participants,
            gift_list: event.gift_list.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub event_id: Uuid,
    pub receiver: AccountSummary,
    pub wish_list: Vec<Gift>,
}
