use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::Gift;
use crate::utils::normalize_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Organizer,
    Participant,
}

/// invited -> accepted | declined; no other transition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Invited,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Normalized (trimmed, lower-case); unique within a roster.
    pub email: String,
    pub account_id: Option<i64>,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub wish_list: Vec<Gift>,
    pub assigned_to: Option<i64>,
    pub assigned_by: Option<i64>,
}

impl Participant {
    pub fn is_organizer(&self) -> bool {
        self.role == ParticipantRole::Organizer
    }

    pub fn is_eligible(&self) -> bool {
        self.status == ParticipantStatus::Accepted
    }

    pub fn matches_email(&self, email: &str) -> bool {
        self.email == normalize_email(email)
    }
}

/// Ordered participants of one event.
///
/// Invariants kept here: emails are unique (case-insensitive) and the
/// organizer record, created with the roster, is never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<Participant>);

impl Roster {
    /// A roster holding only the auto-accepted organizer.
    pub fn with_organizer(email: &str, account_id: i64, now: DateTime<Utc>) -> Self {
        Self(vec![Participant {
            email: normalize_email(email),
            account_id: Some(account_id),
            role: ParticipantRole::Organizer,
            status: ParticipantStatus::Accepted,
            joined_at: now,
            wish_list: Vec::new(),
            assigned_to: None,
            assigned_by: None,
        }])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Participant> {
        self.0.iter_mut()
    }

    pub fn position(&self, email: &str) -> Option<usize> {
        let email = normalize_email(email);
        self.0.iter().position(|p| p.email == email)
    }

    pub fn get(&self, email: &str) -> Option<&Participant> {
        self.position(email).map(|i| &self.0[i])
    }

    pub fn get_mut(&mut self, email: &str) -> Option<&mut Participant> {
        self.position(email).map(move |i| &mut self.0[i])
    }

    pub fn by_account(&self, account_id: i64) -> Option<&Participant> {
        self.0.iter().find(|p| p.account_id == Some(account_id))
    }

    pub fn by_account_mut(&mut self, account_id: i64) -> Option<&mut Participant> {
        self.0.iter_mut().find(|p| p.account_id == Some(account_id))
    }

    pub fn organizer(&self) -> Option<&Participant> {
        self.0.iter().find(|p| p.is_organizer())
    }

    /// Appends an `invited` record.
    pub fn push_invited(
        &mut self,
        email: &str,
        account_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<&Participant> {
        if self.position(email).is_some() {
            return Err(AppError::Conflict(format!(
                "{} is already invited to this event",
                normalize_email(email)
            )));
        }
        self.0.push(Participant {
            email: normalize_email(email),
            account_id,
            role: ParticipantRole::Participant,
            status: ParticipantStatus::Invited,
            joined_at: now,
            wish_list: Vec::new(),
            assigned_to: None,
            assigned_by: None,
        });
        Ok(&self.0[self.0.len() - 1])
    }

    /// Deletes the record at `index` and clears every assignment pointing at
    /// the removed account.
    pub fn remove_at(&mut self, index: usize) -> Participant {
        let removed = self.0.remove(index);
        if let Some(account_id) = removed.account_id {
            for p in &mut self.0 {
                if p.assigned_to == Some(account_id) {
                    p.assigned_to = None;
                }
                if p.assigned_by == Some(account_id) {
                    p.assigned_by = None;
                }
            }
        }
        removed
    }

    /// Positions of the participants taking part in a draw, in roster order.
    pub fn eligible_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_eligible())
            .map(|(i, _)| i)
            .collect()
    }

    /// Writes a draw result onto the roster.
    ///
    /// `eligible[i]` gives `eligible[derangement[i]]`. Participants outside
    /// `eligible` are left untouched. Calling this twice overwrites the first
    /// result; callers guard against that.
    pub fn apply_assignment(&mut self, eligible: &[usize], derangement: &[usize]) {
        debug_assert_eq!(eligible.len(), derangement.len());
        for (i, &target) in derangement.iter().enumerate() {
            let giver = eligible[i];
            let receiver = eligible[target];
            let giver_account = self.0[giver].account_id;
            let receiver_account = self.0[receiver].account_id;
            self.0[giver].assigned_to = receiver_account;
            self.0[receiver].assigned_by = giver_account;
        }
    }

    /// Moves the record linked to `account_id` to a new email. Returns
    /// whether anything changed; another record already holding `email`
    /// wins and nothing is touched.
    pub fn rename_account(&mut self, account_id: i64, email: &str) -> bool {
        let email = normalize_email(email);
        if self.0.iter().any(|p| p.email == email) {
            return false;
        }
        match self.by_account_mut(account_id) {
            Some(p) => {
                p.email = email;
                true
            }
            None => false,
        }
    }

    /// Attaches `account_id` to a pending invitation for `email` that has
    /// no account yet. Returns whether anything changed.
    pub fn link_pending(&mut self, email: &str, account_id: i64) -> bool {
        match self.get_mut(email) {
            Some(p) if p.account_id.is_none() && p.status == ParticipantStatus::Invited => {
                p.account_id = Some(account_id);
                true
            }
            _ => false,
        }
    }
}
