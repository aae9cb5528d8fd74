//! In-process [`MatchStore`] for tests and local runs without a database

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::MatchStore;
use crate::model::{
    Acceptance, AcceptanceSlot, CandidateProfile, ConfirmedMatch, MatchParties, NewNotification,
    NewPotentialMatch, Notification, Party, PartyAcceptance, PartyProfile, PotentialMatch,
    PotentialMatchStatus,
};

#[derive(Default)]
struct State {
    candidates: Vec<CandidateProfile>,
    potential: Vec<PotentialMatch>,
    confirmed: Vec<ConfirmedMatch>,
    notifications: Vec<Notification>,
    fail_reads: bool,
    fail_acceptance: bool,
    failing_users: HashSet<String>,
}

/// Match store holding everything in memory behind a mutex
#[derive(Default)]
pub struct MemoryMatchStore {
    state: Mutex<State>,
}

fn unavailable(what: &str) -> DatabaseError {
    DatabaseError::Query(sqlx::Error::Protocol(format!("{what} unavailable")))
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(candidates: Vec<CandidateProfile>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.candidates = candidates;
        }
        store
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| unavailable("store"))
    }

    /// Make `matching_candidates` fail
    pub fn fail_reads(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_reads = true;
        }
    }

    /// Make acceptance writes fail, or succeed again
    pub fn fail_acceptance(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_acceptance = fail;
        }
    }

    /// Make inserts of potential matches involving `user_id` fail
    pub fn fail_inserts_for(&self, user_id: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_users.insert(user_id.into());
        }
    }

    /// Add a potential match directly, bypassing validation
    pub fn seed_potential(&self, potential: PotentialMatch) {
        if let Ok(mut state) = self.state.lock() {
            state.potential.push(potential);
        }
    }

    /// Add a confirmed match with no acceptances
    pub fn seed_confirmed(&self, parties: MatchParties) -> ConfirmedMatch {
        let confirmed = ConfirmedMatch {
            id: Uuid::new_v4(),
            potential_match_id: Uuid::new_v4(),
            parties,
            rationale: String::new(),
            first: Acceptance::default(),
            second: Acceptance::default(),
            completed_at: None,
            created_at: Utc::now(),
        };
        if let Ok(mut state) = self.state.lock() {
            state.confirmed.push(confirmed.clone());
        }
        confirmed
    }

    pub fn potential_matches(&self) -> Vec<PotentialMatch> {
        self.state
            .lock()
            .map(|s| s.potential.clone())
            .unwrap_or_default()
    }

    pub fn confirmed_matches(&self) -> Vec<ConfirmedMatch> {
        self.state
            .lock()
            .map(|s| s.confirmed.clone())
            .unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state
            .lock()
            .map(|s| s.notifications.clone())
            .unwrap_or_default()
    }
}

fn same_pair(parties: &MatchParties, a: &str, b: &str) -> bool {
    match parties {
        MatchParties::Mutual {
            user1_id, user2_id, ..
        } => (user1_id == a && user2_id == b) || (user1_id == b && user2_id == a),
        MatchParties::Legacy { .. } => false,
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn matching_candidates(&self) -> DatabaseResult<Vec<CandidateProfile>> {
        let state = self.lock()?;
        if state.fail_reads {
            return Err(unavailable("users"));
        }
        Ok(state
            .candidates
            .iter()
            .filter(|c| {
                c.user
                    .current_focus
                    .as_deref()
                    .is_some_and(|f| !f.trim().is_empty())
            })
            .cloned()
            .collect())
    }

    async fn pending_pair_exists(&self, user_a: &str, user_b: &str) -> DatabaseResult<bool> {
        let state = self.lock()?;
        Ok(state.potential.iter().any(|p| {
            p.status == PotentialMatchStatus::Pending && same_pair(&p.parties, user_a, user_b)
        }))
    }

    async fn insert_potential_match(
        &self,
        new: &NewPotentialMatch,
    ) -> DatabaseResult<PotentialMatch> {
        let mut state = self.lock()?;
        if state.failing_users.contains(&new.user1_id) || state.failing_users.contains(&new.user2_id)
        {
            return Err(unavailable("potential_matches"));
        }

        let potential = PotentialMatch {
            id: Uuid::new_v4(),
            parties: MatchParties::Mutual {
                user1_id: new.user1_id.clone(),
                user2_id: new.user2_id.clone(),
                match_type: new.match_type.clone(),
                mutual_score: new.mutual_score,
                exchange: new.exchange.clone(),
            },
            rationale: new.rationale.clone(),
            status: PotentialMatchStatus::Pending,
            confirmed_at: None,
            created_at: Utc::now(),
        };
        state.potential.push(potential.clone());
        Ok(potential)
    }

    async fn get_potential_match(&self, id: Uuid) -> DatabaseResult<Option<PotentialMatch>> {
        let state = self.lock()?;
        Ok(state.potential.iter().find(|p| p.id == id).cloned())
    }

    async fn list_potential_matches(
        &self,
        status: Option<PotentialMatchStatus>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<PotentialMatch>, i64)> {
        let state = self.lock()?;
        let mut filtered: Vec<PotentialMatch> = state
            .potential
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = filtered.len() as i64;
        let page = filtered
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn transition_potential_match(
        &self,
        id: Uuid,
        to: PotentialMatchStatus,
    ) -> DatabaseResult<Option<PotentialMatch>> {
        let mut state = self.lock()?;
        let Some(potential) = state
            .potential
            .iter_mut()
            .find(|p| p.id == id && p.status == PotentialMatchStatus::Pending)
        else {
            return Ok(None);
        };

        potential.status = to;
        if to == PotentialMatchStatus::Confirmed {
            potential.confirmed_at = Some(Utc::now());
        }
        Ok(Some(potential.clone()))
    }

    async fn insert_confirmed_match(
        &self,
        potential: &PotentialMatch,
    ) -> DatabaseResult<ConfirmedMatch> {
        let mut state = self.lock()?;
        let confirmed = ConfirmedMatch {
            id: Uuid::new_v4(),
            potential_match_id: potential.id,
            parties: potential.parties.clone(),
            rationale: potential.rationale.clone(),
            first: Acceptance::default(),
            second: Acceptance::default(),
            completed_at: None,
            created_at: Utc::now(),
        };
        state.confirmed.push(confirmed.clone());
        Ok(confirmed)
    }

    async fn get_confirmed_match(&self, id: Uuid) -> DatabaseResult<Option<ConfirmedMatch>> {
        let state = self.lock()?;
        Ok(state.confirmed.iter().find(|c| c.id == id).cloned())
    }

    async fn confirmed_matches_for_user(
        &self,
        user_id: &str,
    ) -> DatabaseResult<Vec<ConfirmedMatch>> {
        let state = self.lock()?;
        let mut matches: Vec<ConfirmedMatch> = state
            .confirmed
            .iter()
            .filter(|c| c.parties.party_of(user_id).is_some())
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn accept_party(
        &self,
        id: Uuid,
        slot: AcceptanceSlot,
    ) -> DatabaseResult<Option<PartyAcceptance>> {
        let mut state = self.lock()?;
        if state.fail_acceptance {
            return Err(unavailable("confirmed_matches"));
        }
        let Some(confirmed) = state.confirmed.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        let party = slot.party();
        let acceptance = match party {
            Party::First => &mut confirmed.first,
            Party::Second => &mut confirmed.second,
        };
        let newly_accepted = !acceptance.accepted;
        acceptance.accepted = true;
        acceptance.accepted_at = acceptance.accepted_at.or_else(|| Some(Utc::now()));

        let newly_completed =
            confirmed.acceptance(party.other()).accepted && confirmed.completed_at.is_none();
        if newly_completed {
            confirmed.completed_at = Some(Utc::now());
        }

        Ok(Some(PartyAcceptance {
            confirmed: confirmed.clone(),
            newly_accepted,
            newly_completed,
        }))
    }

    async fn delete_confirmed_match(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.lock()?;
        let before = state.confirmed.len();
        state.confirmed.retain(|c| c.id != id);
        Ok(state.confirmed.len() < before)
    }

    async fn profiles(&self, user_ids: &[String]) -> DatabaseResult<Vec<PartyProfile>> {
        let state = self.lock()?;
        Ok(state
            .candidates
            .iter()
            .filter(|c| user_ids.contains(&c.user.id))
            .map(|c| PartyProfile {
                id: c.user.id.clone(),
                name: c.user.name.clone(),
            })
            .collect())
    }

    async fn insert_notification(&self, new: &NewNotification) -> DatabaseResult<Notification> {
        let mut state = self.lock()?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            kind: new.kind,
            match_id: new.match_id,
            message: new.message.clone(),
            created_at: Utc::now(),
        };
        state.notifications.push(notification.clone());
        Ok(notification)
    }
}
