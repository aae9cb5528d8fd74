//! Accept and decline transitions for confirmed matches
//!
//! `pending -> accepted -> completed`, where `completed` is reached once both
//! parties have accepted and is never left. Declining deletes the match.

use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{MatchingError, MatchingResult};
use crate::model::{ConfirmedMatch, NewNotification, NotificationKind, Party, PartyProfile};
use crate::store::MatchStore;

/// Result of an accept call
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub confirmed: ConfirmedMatch,
    pub party: Party,
    /// This call set the party's flag
    pub newly_accepted: bool,
    /// This call completed the match
    pub newly_completed: bool,
}

impl AcceptOutcome {
    /// Notifications this transition should produce. A repeated accept
    /// produces none. Parties are named from `profiles`, falling back to
    /// their id.
    pub fn notifications(&self, profiles: &HashMap<String, PartyProfile>) -> Vec<NewNotification> {
        let parties = &self.confirmed.parties;
        let name = |party: Party| {
            let id = parties.user_id(party);
            profiles
                .get(id)
                .map(|profile| profile.name.as_str())
                .unwrap_or(id)
        };

        if self.newly_completed {
            return [Party::First, Party::Second]
                .into_iter()
                .map(|party| NewNotification {
                    user_id: parties.user_id(party).to_string(),
                    kind: NotificationKind::MatchCompleted,
                    match_id: Some(self.confirmed.id),
                    message: format!(
                        "You and {} have both accepted the introduction.",
                        name(party.other())
                    ),
                })
                .collect();
        }

        if self.newly_accepted {
            return vec![NewNotification {
                user_id: parties.user_id(self.party.other()).to_string(),
                kind: NotificationKind::MatchAccepted,
                match_id: Some(self.confirmed.id),
                message: format!("{} accepted your introduction.", name(self.party)),
            }];
        }

        Vec::new()
    }
}

/// Record `user_id`'s acceptance. The match completes in the same write
/// once both parties have accepted. Accepting twice leaves the state
/// unchanged.
pub async fn accept(
    store: &dyn MatchStore,
    match_id: Uuid,
    user_id: &str,
) -> MatchingResult<AcceptOutcome> {
    let current = store
        .get_confirmed_match(match_id)
        .await?
        .ok_or(MatchingError::NotFound)?;

    let Some(party) = current.parties.party_of(user_id) else {
        warn!(%match_id, user_id, "Accept by a user outside the match");
        return Err(MatchingError::NotParty);
    };

    let written = store
        .accept_party(match_id, current.parties.slot(party))
        .await?
        .ok_or(MatchingError::NotFound)?;

    info!(
        %match_id,
        user_id,
        completed = written.confirmed.completed_at.is_some(),
        "Match accepted"
    );

    Ok(AcceptOutcome {
        confirmed: written.confirmed,
        party,
        newly_accepted: written.newly_accepted,
        newly_completed: written.newly_completed,
    })
}

/// Delete the match on behalf of one of its parties. A non-party leaves the
/// row untouched.
pub async fn decline(store: &dyn MatchStore, match_id: Uuid, user_id: &str) -> MatchingResult<()> {
    let current = store
        .get_confirmed_match(match_id)
        .await?
        .ok_or(MatchingError::NotFound)?;

    if current.parties.party_of(user_id).is_none() {
        warn!(%match_id, user_id, "Decline by a user outside the match");
        return Err(MatchingError::NotParty);
    }

    if !store.delete_confirmed_match(match_id).await? {
        return Err(MatchingError::NotFound);
    }

    info!(%match_id, user_id, "Match declined");
    Ok(())
}
