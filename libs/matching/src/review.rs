//! Administrative review of potential matches

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{MatchingError, MatchingResult};
use crate::model::{
    ConfirmedMatch, NewNotification, NotificationKind, Party, PotentialMatch,
    PotentialMatchStatus,
};
use crate::store::MatchStore;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct PotentialMatchPage {
    pub items: Vec<PotentialMatch>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Clamp paging input: page is at least 1, limit within 1..=100
pub fn clamp_paging(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

pub async fn list(
    store: &dyn MatchStore,
    status: Option<PotentialMatchStatus>,
    page: Option<i64>,
    limit: Option<i64>,
) -> MatchingResult<PotentialMatchPage> {
    let (page, limit) = clamp_paging(page, limit);
    let offset = (page - 1).saturating_mul(limit);
    let (items, total) = store.list_potential_matches(status, limit, offset).await?;

    Ok(PotentialMatchPage {
        items,
        page,
        limit,
        total,
    })
}

async fn transition(
    store: &dyn MatchStore,
    id: Uuid,
    to: PotentialMatchStatus,
) -> MatchingResult<PotentialMatch> {
    if let Some(updated) = store.transition_potential_match(id, to).await? {
        return Ok(updated);
    }

    // Distinguish a missing row from one that already left `pending`.
    match store.get_potential_match(id).await? {
        Some(current) => {
            warn!(%id, from = %current.status, to = %to, "Rejected status transition");
            Err(MatchingError::InvalidTransition {
                from: current.status,
            })
        }
        None => Err(MatchingError::NotFound),
    }
}

/// Confirm a pending potential match and create its confirmed match
pub async fn confirm(store: &dyn MatchStore, id: Uuid) -> MatchingResult<ConfirmedMatch> {
    let potential = transition(store, id, PotentialMatchStatus::Confirmed).await?;
    let confirmed = store.insert_confirmed_match(&potential).await?;

    info!(potential_match_id = %id, confirmed_match_id = %confirmed.id, "Match confirmed");
    Ok(confirmed)
}

pub async fn reject(store: &dyn MatchStore, id: Uuid) -> MatchingResult<PotentialMatch> {
    let rejected = transition(store, id, PotentialMatchStatus::Rejected).await?;
    info!(potential_match_id = %id, "Match rejected");
    Ok(rejected)
}

/// One `match_confirmed` notification per party
pub fn confirmation_notifications(confirmed: &ConfirmedMatch) -> Vec<NewNotification> {
    [Party::First, Party::Second]
        .into_iter()
        .map(|party| NewNotification {
            user_id: confirmed.parties.user_id(party).to_string(),
            kind: NotificationKind::MatchConfirmed,
            match_id: Some(confirmed.id),
            message: "You have a new introduction waiting for your response.".to_string(),
        })
        .collect()
}
