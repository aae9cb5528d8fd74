//! Viewer-relative presentation of confirmed matches

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{ConfirmedMatch, MatchParties, Party, PartyProfile};

/// Status of a confirmed match as one party sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// The viewer has not accepted yet
    Pending,
    /// The viewer accepted, the other party has not
    Accepted,
    /// Both accepted
    Completed,
}

impl MatchStatus {
    pub fn from_flags(mine: bool, theirs: bool) -> Self {
        match (mine, theirs) {
            (true, true) => MatchStatus::Completed,
            (true, false) => MatchStatus::Accepted,
            _ => MatchStatus::Pending,
        }
    }
}

/// The viewer's role in the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Seeker,
    Helper,
    User1,
    User2,
}

/// Uniform view model for either stored shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub is_mutual: bool,
    pub role: ViewerRole,
    pub status: MatchStatus,
    pub other_user: PartyProfile,
    pub my_accepted: bool,
    pub their_accepted: bool,
    pub match_type: Option<String>,
    pub mutual_score: Option<f64>,
    pub you_give: Option<String>,
    pub you_get: Option<String>,
    pub they_give: Option<String>,
    pub they_get: Option<String>,
    pub request_id: Option<Uuid>,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

struct ShapeFields {
    role: ViewerRole,
    match_type: Option<String>,
    mutual_score: Option<f64>,
    you_give: Option<String>,
    you_get: Option<String>,
    they_give: Option<String>,
    they_get: Option<String>,
    request_id: Option<Uuid>,
}

fn shape_fields(parties: &MatchParties, party: Party) -> ShapeFields {
    match parties {
        MatchParties::Legacy { request_id, .. } => ShapeFields {
            role: match party {
                Party::First => ViewerRole::Seeker,
                Party::Second => ViewerRole::Helper,
            },
            match_type: None,
            mutual_score: None,
            you_give: None,
            you_get: None,
            they_give: None,
            they_get: None,
            request_id: *request_id,
        },
        MatchParties::Mutual {
            match_type,
            mutual_score,
            exchange,
            ..
        } => {
            let (role, mine, theirs) = match party {
                Party::First => (
                    ViewerRole::User1,
                    (&exchange.user1_gives, &exchange.user1_gets),
                    (&exchange.user2_gives, &exchange.user2_gets),
                ),
                Party::Second => (
                    ViewerRole::User2,
                    (&exchange.user2_gives, &exchange.user2_gets),
                    (&exchange.user1_gives, &exchange.user1_gets),
                ),
            };
            ShapeFields {
                role,
                match_type: Some(match_type.clone()),
                mutual_score: Some(*mutual_score),
                you_give: Some(mine.0.clone()),
                you_get: Some(mine.1.clone()),
                they_give: Some(theirs.0.clone()),
                they_get: Some(theirs.1.clone()),
                request_id: None,
            }
        }
    }
}

/// Build the viewer's view of a match, or `None` when the viewer is not a
/// party. A missing profile falls back to the other party's id as name.
pub fn transform(
    confirmed: &ConfirmedMatch,
    viewer_id: &str,
    profiles: &HashMap<String, PartyProfile>,
) -> Option<MatchView> {
    let party = confirmed.parties.party_of(viewer_id)?;
    let other_id = confirmed.parties.user_id(party.other());
    let other_user = profiles.get(other_id).cloned().unwrap_or_else(|| PartyProfile {
        id: other_id.to_string(),
        name: other_id.to_string(),
    });

    let my_accepted = confirmed.acceptance(party).accepted;
    let their_accepted = confirmed.acceptance(party.other()).accepted;
    let fields = shape_fields(&confirmed.parties, party);

    Some(MatchView {
        id: confirmed.id,
        is_mutual: confirmed.parties.is_mutual(),
        role: fields.role,
        status: MatchStatus::from_flags(my_accepted, their_accepted),
        other_user,
        my_accepted,
        their_accepted,
        match_type: fields.match_type,
        mutual_score: fields.mutual_score,
        you_give: fields.you_give,
        you_get: fields.you_get,
        they_give: fields.they_give,
        they_get: fields.they_get,
        request_id: fields.request_id,
        rationale: confirmed.rationale.clone(),
        created_at: confirmed.created_at,
        completed_at: confirmed.completed_at,
    })
}

/// Transform a user's matches, dropping any the user is not a party to
pub fn transform_all(
    matches: &[ConfirmedMatch],
    viewer_id: &str,
    profiles: &HashMap<String, PartyProfile>,
) -> Vec<MatchView> {
    matches
        .iter()
        .filter_map(|confirmed| transform(confirmed, viewer_id, profiles))
        .collect()
}
