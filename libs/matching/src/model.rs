//! Domain types for users, matches and notifications

use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User row as read for matching
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub current_focus: Option<String>,
    pub background: Option<String>,
    pub role_title: Option<String>,
    pub experience_years: Option<i32>,
    pub industry: Option<String>,
}

/// A help area a user claims, with its justification
#[derive(Debug, Clone)]
pub struct ExpertiseClaim {
    pub user_id: String,
    pub title: String,
    pub proof: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    Urgent,
    Standard,
    Flexible,
}

impl FromStr for Timeline {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Timeline::Urgent),
            "standard" => Ok(Timeline::Standard),
            "flexible" => Ok(Timeline::Flexible),
            other => Err(DatabaseError::CorruptRecord(format!("unknown timeline '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HelpRequest {
    pub id: Uuid,
    pub user_id: String,
    pub challenge: Option<String>,
    pub title: Option<String>,
    pub reason: Option<String>,
    pub proof: Option<String>,
    pub help_type: String,
    pub timeline: Timeline,
    pub status: String,
}

impl HelpRequest {
    pub fn is_open(&self) -> bool {
        self.status == "open"
    }

    /// The challenge text, falling back to the title
    pub fn headline(&self) -> &str {
        non_empty(self.challenge.as_deref())
            .or_else(|| non_empty(self.title.as_deref()))
            .unwrap_or("")
    }
}

/// A user together with the child records eligibility looks at
#[derive(Debug, Clone, Default)]
pub struct CandidateProfile {
    pub user: UserRecord,
    pub claims: Vec<ExpertiseClaim>,
    pub requests: Vec<HelpRequest>,
}

/// Normalized user record handed to the prompt builder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserForMatching {
    pub id: String,
    pub name: String,
    pub proven_expertise: Vec<String>,
    pub current_asks: Vec<String>,
    pub general_background: String,
}

/// Narrative exchange terms of a mutual match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutualExchange {
    pub user1_gives: String,
    pub user1_gets: String,
    pub user2_gives: String,
    pub user2_gets: String,
}

/// The two parties of a match, in either stored shape.
///
/// Legacy rows pair a seeker with a helper around one help request; mutual
/// rows pair two users who each give and get something.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MatchParties {
    Legacy {
        seeker_id: String,
        helper_id: String,
        request_id: Option<Uuid>,
    },
    Mutual {
        user1_id: String,
        user2_id: String,
        match_type: String,
        mutual_score: f64,
        exchange: MutualExchange,
    },
}

/// Nullable party columns exactly as stored
#[derive(Debug, Clone, Default)]
pub struct PartyColumns {
    pub seeker_id: Option<String>,
    pub helper_id: Option<String>,
    pub request_id: Option<Uuid>,
    pub user1_id: Option<String>,
    pub user2_id: Option<String>,
    pub match_type: Option<String>,
    pub mutual_score: Option<f64>,
    pub user1_gives: Option<String>,
    pub user1_gets: Option<String>,
    pub user2_gives: Option<String>,
    pub user2_gets: Option<String>,
}

impl PartyColumns {
    /// Decode the stored columns. Both mutual ids present means mutual,
    /// otherwise the row must carry a complete legacy pair.
    pub fn into_parties(self) -> Result<MatchParties, DatabaseError> {
        match (self.user1_id, self.user2_id) {
            (Some(user1_id), Some(user2_id)) => Ok(MatchParties::Mutual {
                user1_id,
                user2_id,
                match_type: self.match_type.ok_or_else(|| {
                    DatabaseError::CorruptRecord("mutual match row has no match_type".to_string())
                })?,
                mutual_score: self.mutual_score.ok_or_else(|| {
                    DatabaseError::CorruptRecord("mutual match row has no mutual_score".to_string())
                })?,
                exchange: MutualExchange {
                    user1_gives: self.user1_gives.unwrap_or_default(),
                    user1_gets: self.user1_gets.unwrap_or_default(),
                    user2_gives: self.user2_gives.unwrap_or_default(),
                    user2_gets: self.user2_gets.unwrap_or_default(),
                },
            }),
            _ => match (self.seeker_id, self.helper_id) {
                (Some(seeker_id), Some(helper_id)) => Ok(MatchParties::Legacy {
                    seeker_id,
                    helper_id,
                    request_id: self.request_id,
                }),
                _ => Err(DatabaseError::CorruptRecord(
                    "match row has neither a mutual nor a legacy party pair".to_string(),
                )),
            },
        }
    }
}

/// Which side of a match a user is on: seeker or user1 is `First`,
/// helper or user2 is `Second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    First,
    Second,
}

impl Party {
    pub fn other(self) -> Party {
        match self {
            Party::First => Party::Second,
            Party::Second => Party::First,
        }
    }
}

/// Stored acceptance flag a party writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceSlot {
    Seeker,
    Helper,
    User1,
    User2,
}

impl AcceptanceSlot {
    /// Flag and timestamp column names
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            AcceptanceSlot::Seeker => ("seeker_accepted", "seeker_accepted_at"),
            AcceptanceSlot::Helper => ("helper_accepted", "helper_accepted_at"),
            AcceptanceSlot::User1 => ("user1_accepted", "user1_accepted_at"),
            AcceptanceSlot::User2 => ("user2_accepted", "user2_accepted_at"),
        }
    }

    pub fn party(self) -> Party {
        match self {
            AcceptanceSlot::Seeker | AcceptanceSlot::User1 => Party::First,
            AcceptanceSlot::Helper | AcceptanceSlot::User2 => Party::Second,
        }
    }

    /// Slot of the other party in the same shape
    pub fn counterpart(self) -> AcceptanceSlot {
        match self {
            AcceptanceSlot::Seeker => AcceptanceSlot::Helper,
            AcceptanceSlot::Helper => AcceptanceSlot::Seeker,
            AcceptanceSlot::User1 => AcceptanceSlot::User2,
            AcceptanceSlot::User2 => AcceptanceSlot::User1,
        }
    }
}

impl MatchParties {
    pub fn is_mutual(&self) -> bool {
        matches!(self, MatchParties::Mutual { .. })
    }

    pub fn user_id(&self, party: Party) -> &str {
        match (self, party) {
            (MatchParties::Legacy { seeker_id, .. }, Party::First) => seeker_id,
            (MatchParties::Legacy { helper_id, .. }, Party::Second) => helper_id,
            (MatchParties::Mutual { user1_id, .. }, Party::First) => user1_id,
            (MatchParties::Mutual { user2_id, .. }, Party::Second) => user2_id,
        }
    }

    /// Which party `user_id` is, if any
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if self.user_id(Party::First) == user_id {
            Some(Party::First)
        } else if self.user_id(Party::Second) == user_id {
            Some(Party::Second)
        } else {
            None
        }
    }

    pub fn slot(&self, party: Party) -> AcceptanceSlot {
        match (self, party) {
            (MatchParties::Legacy { .. }, Party::First) => AcceptanceSlot::Seeker,
            (MatchParties::Legacy { .. }, Party::Second) => AcceptanceSlot::Helper,
            (MatchParties::Mutual { .. }, Party::First) => AcceptanceSlot::User1,
            (MatchParties::Mutual { .. }, Party::Second) => AcceptanceSlot::User2,
        }
    }

    pub fn user_ids(&self) -> [&str; 2] {
        [self.user_id(Party::First), self.user_id(Party::Second)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotentialMatchStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl PotentialMatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PotentialMatchStatus::Pending => "pending",
            PotentialMatchStatus::Confirmed => "confirmed",
            PotentialMatchStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for PotentialMatchStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PotentialMatchStatus::Pending),
            "confirmed" => Ok(PotentialMatchStatus::Confirmed),
            "rejected" => Ok(PotentialMatchStatus::Rejected),
            other => Err(DatabaseError::CorruptRecord(format!(
                "unknown potential match status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PotentialMatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed pairing awaiting administrative review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialMatch {
    pub id: Uuid,
    pub parties: MatchParties,
    pub rationale: String,
    pub status: PotentialMatchStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a model-proposed mutual match
#[derive(Debug, Clone, PartialEq)]
pub struct NewPotentialMatch {
    pub user1_id: String,
    pub user2_id: String,
    pub match_type: String,
    pub mutual_score: f64,
    pub exchange: MutualExchange,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Acceptance {
    pub accepted: bool,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// A confirmed introduction both parties can accept or decline.
///
/// `completed_at` is set exactly when both parties have accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedMatch {
    pub id: Uuid,
    pub potential_match_id: Uuid,
    pub parties: MatchParties,
    pub rationale: String,
    pub first: Acceptance,
    pub second: Acceptance,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConfirmedMatch {
    pub fn acceptance(&self, party: Party) -> &Acceptance {
        match party {
            Party::First => &self.first,
            Party::Second => &self.second,
        }
    }

    pub fn both_accepted(&self) -> bool {
        self.first.accepted && self.second.accepted
    }
}

/// A confirmed match after one acceptance write, with what that write
/// changed
#[derive(Debug, Clone, PartialEq)]
pub struct PartyAcceptance {
    pub confirmed: ConfirmedMatch,
    pub newly_accepted: bool,
    pub newly_completed: bool,
}

/// Display data for the other side of a match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyProfile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchConfirmed,
    MatchAccepted,
    MatchCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MatchConfirmed => "match_confirmed",
            NotificationKind::MatchAccepted => "match_accepted",
            NotificationKind::MatchCompleted => "match_completed",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match_confirmed" => Ok(NotificationKind::MatchConfirmed),
            "match_accepted" => Ok(NotificationKind::MatchAccepted),
            "match_completed" => Ok(NotificationKind::MatchCompleted),
            other => Err(DatabaseError::CorruptRecord(format!(
                "unknown notification kind '{}'",
                other
            ))),
        }
    }
}

/// Notification waiting to be delivered; this is the job payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub match_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub kind: NotificationKind,
    pub match_id: Option<Uuid>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutual_columns_win_over_legacy() {
        let columns = PartyColumns {
            seeker_id: Some("s".to_string()),
            helper_id: Some("h".to_string()),
            user1_id: Some("a".to_string()),
            user2_id: Some("b".to_string()),
            match_type: Some("mutual".to_string()),
            mutual_score: Some(7.5),
            ..Default::default()
        };

        let parties = columns.into_parties().unwrap();
        assert!(parties.is_mutual());
        assert_eq!(parties.user_ids(), ["a", "b"]);
    }

    #[test]
    fn test_half_mutual_row_falls_back_to_legacy() {
        let columns = PartyColumns {
            seeker_id: Some("s".to_string()),
            helper_id: Some("h".to_string()),
            user1_id: Some("a".to_string()),
            ..Default::default()
        };

        let parties = columns.into_parties().unwrap();
        assert!(!parties.is_mutual());
        assert_eq!(parties.party_of("h"), Some(Party::Second));
        assert_eq!(parties.party_of("a"), None);
    }

    #[test]
    fn test_row_without_parties_is_corrupt() {
        let columns = PartyColumns {
            seeker_id: Some("s".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            columns.into_parties(),
            Err(DatabaseError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_mutual_row_without_score_is_corrupt() {
        let columns = PartyColumns {
            user1_id: Some("a".to_string()),
            user2_id: Some("b".to_string()),
            match_type: Some("mutual".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            columns.into_parties(),
            Err(DatabaseError::CorruptRecord(_))
        ));

        let columns = PartyColumns {
            user1_id: Some("a".to_string()),
            user2_id: Some("b".to_string()),
            mutual_score: Some(8.0),
            ..Default::default()
        };
        assert!(matches!(
            columns.into_parties(),
            Err(DatabaseError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_slots_follow_shape() {
        let legacy = MatchParties::Legacy {
            seeker_id: "s".to_string(),
            helper_id: "h".to_string(),
            request_id: None,
        };
        assert_eq!(legacy.slot(Party::First), AcceptanceSlot::Seeker);
        assert_eq!(legacy.slot(Party::Second).columns().0, "helper_accepted");
        assert_eq!(AcceptanceSlot::User2.party(), Party::Second);
    }

    #[test]
    fn test_request_headline_falls_back_to_title() {
        let request = HelpRequest {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            challenge: Some("   ".to_string()),
            title: Some("Fundraising".to_string()),
            reason: None,
            proof: None,
            help_type: "advice".to_string(),
            timeline: Timeline::Standard,
            status: "open".to_string(),
        };
        assert_eq!(request.headline(), "Fundraising");
    }
}
