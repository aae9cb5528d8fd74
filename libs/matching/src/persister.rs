//! Validates model proposals and stores the valid ones as pending matches

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

use crate::generator::RawProposal;
use crate::model::{MutualExchange, NewPotentialMatch, PotentialMatch, UserForMatching};
use crate::prompt::{MAX_MUTUAL_SCORE, MIN_MUTUAL_SCORE};
use crate::store::MatchStore;

/// Why a proposal was not stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingField { field: &'static str },
    UnknownUser { user_id: String },
    SelfMatch,
    ScoreOutOfRange { score: f64 },
    UserAlreadyMatched { user_id: String },
    DuplicatePending,
    InsertFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedProposal {
    pub user1_id: Option<String>,
    pub user2_id: Option<String>,
    pub reason: SkipReason,
}

/// A stored match with both display names resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedMatch {
    #[serde(flatten)]
    pub potential_match: PotentialMatch,
    pub user1_name: String,
    pub user2_name: String,
}

/// What happened to every proposal of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    pub created: Vec<CreatedMatch>,
    pub skipped: Vec<SkippedProposal>,
}

/// A proposal that passed validation, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProposal {
    pub new_match: NewPotentialMatch,
    pub user1_name: String,
    pub user2_name: String,
}

fn check_proposal(
    proposal: &RawProposal,
    users: &HashMap<&str, &UserForMatching>,
) -> Result<ValidProposal, SkipReason> {
    let user1_id = proposal
        .user1_id
        .as_deref()
        .ok_or(SkipReason::MissingField { field: "user1_id" })?;
    let user2_id = proposal
        .user2_id
        .as_deref()
        .ok_or(SkipReason::MissingField { field: "user2_id" })?;

    let user1 = users.get(user1_id).ok_or_else(|| SkipReason::UnknownUser {
        user_id: user1_id.to_string(),
    })?;
    let user2 = users.get(user2_id).ok_or_else(|| SkipReason::UnknownUser {
        user_id: user2_id.to_string(),
    })?;

    if user1.id == user2.id {
        return Err(SkipReason::SelfMatch);
    }

    let score = proposal.mutual_score.ok_or(SkipReason::MissingField {
        field: "mutual_score",
    })?;
    if !(score > MIN_MUTUAL_SCORE && score <= MAX_MUTUAL_SCORE) {
        return Err(SkipReason::ScoreOutOfRange { score });
    }

    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    Ok(ValidProposal {
        new_match: NewPotentialMatch {
            user1_id: user1.id.clone(),
            user2_id: user2.id.clone(),
            match_type: text(&proposal.match_type),
            mutual_score: score,
            exchange: MutualExchange {
                user1_gives: text(&proposal.user1_gives),
                user1_gets: text(&proposal.user1_gets),
                user2_gives: text(&proposal.user2_gives),
                user2_gets: text(&proposal.user2_gets),
            },
            rationale: text(&proposal.rationale),
        },
        user1_name: user1.name.clone(),
        user2_name: user2.name.clone(),
    })
}

/// Check each proposal on its own against the eligible users, keeping
/// proposal order. Stored ids are always the canonical ids from `users`.
pub fn validate_proposals(
    proposals: &[RawProposal],
    users: &[UserForMatching],
) -> Vec<Result<ValidProposal, SkippedProposal>> {
    let by_id: HashMap<&str, &UserForMatching> =
        users.iter().map(|user| (user.id.as_str(), user)).collect();

    proposals
        .iter()
        .map(|proposal| {
            check_proposal(proposal, &by_id).map_err(|reason| {
                warn!(
                    user1_id = ?proposal.user1_id,
                    user2_id = ?proposal.user2_id,
                    reason = ?reason,
                    "Skipping model proposal"
                );
                SkippedProposal {
                    user1_id: proposal.user1_id.clone(),
                    user2_id: proposal.user2_id.clone(),
                    reason,
                }
            })
        })
        .collect()
}

/// Store valid proposals as pending potential matches, in order. A person
/// is taken once a match including them is stored, so later proposals
/// naming them are skipped. Failures are recorded per proposal and never
/// abort the batch.
pub async fn persist_matches(
    store: &dyn MatchStore,
    proposals: &[RawProposal],
    users: &[UserForMatching],
) -> GenerationReport {
    let mut matched: HashSet<String> = HashSet::new();
    let mut created = Vec::new();
    let mut skipped = Vec::new();

    for checked in validate_proposals(proposals, users) {
        let proposal = match checked {
            Ok(proposal) => proposal,
            Err(skip) => {
                skipped.push(skip);
                continue;
            }
        };

        let new_match = &proposal.new_match;
        let skip = |reason: SkipReason| SkippedProposal {
            user1_id: Some(new_match.user1_id.clone()),
            user2_id: Some(new_match.user2_id.clone()),
            reason,
        };

        if let Some(taken) = [&new_match.user1_id, &new_match.user2_id]
            .into_iter()
            .find(|id| matched.contains(id.as_str()))
        {
            debug!(user_id = %taken, "User already matched in this run");
            skipped.push(skip(SkipReason::UserAlreadyMatched {
                user_id: taken.clone(),
            }));
            continue;
        }

        match store
            .pending_pair_exists(&new_match.user1_id, &new_match.user2_id)
            .await
        {
            Ok(true) => {
                debug!(
                    user1_id = %new_match.user1_id,
                    user2_id = %new_match.user2_id,
                    "Pending match already exists for pair"
                );
                skipped.push(skip(SkipReason::DuplicatePending));
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Failed to check for a pending match");
                skipped.push(skip(SkipReason::InsertFailed {
                    message: e.to_string(),
                }));
                continue;
            }
        }

        match store.insert_potential_match(new_match).await {
            Ok(potential_match) => {
                matched.insert(new_match.user1_id.clone());
                matched.insert(new_match.user2_id.clone());
                created.push(CreatedMatch {
                    potential_match,
                    user1_name: proposal.user1_name,
                    user2_name: proposal.user2_name,
                });
            }
            Err(e) if e.is_unique_violation() => {
                skipped.push(skip(SkipReason::DuplicatePending));
            }
            Err(e) => {
                error!(
                    user1_id = %new_match.user1_id,
                    user2_id = %new_match.user2_id,
                    error = %e,
                    "Failed to insert potential match"
                );
                skipped.push(skip(SkipReason::InsertFailed {
                    message: e.to_string(),
                }));
            }
        }
    }

    info!(
        created = created.len(),
        skipped = skipped.len(),
        "Persisted generated matches"
    );
    GenerationReport { created, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMatchStore;

    fn user(id: &str) -> UserForMatching {
        UserForMatching {
            id: id.to_string(),
            name: format!("Name {id}"),
            proven_expertise: Vec::new(),
            current_asks: Vec::new(),
            general_background: String::new(),
        }
    }

    fn proposal(a: &str, b: &str, score: f64) -> RawProposal {
        RawProposal {
            user1_id: Some(a.to_string()),
            user2_id: Some(b.to_string()),
            mutual_score: Some(score),
            user1_gives: Some("intros".to_string()),
            ..Default::default()
        }
    }

    fn reasons(skipped: &[SkippedProposal]) -> Vec<SkipReason> {
        skipped.iter().map(|s| s.reason.clone()).collect()
    }

    fn split(
        checked: Vec<Result<ValidProposal, SkippedProposal>>,
    ) -> (Vec<ValidProposal>, Vec<SkippedProposal>) {
        let mut valid = Vec::new();
        let mut skipped = Vec::new();
        for result in checked {
            match result {
                Ok(proposal) => valid.push(proposal),
                Err(skip) => skipped.push(skip),
            }
        }
        (valid, skipped)
    }

    fn pairs(report: &GenerationReport) -> Vec<[&str; 2]> {
        report
            .created
            .iter()
            .map(|c| c.potential_match.parties.user_ids())
            .collect()
    }

    #[test]
    fn test_valid_proposal_copies_narrative() {
        let users = vec![user("a"), user("b")];
        let (valid, skipped) = split(validate_proposals(&[proposal("a", "b", 8.0)], &users));

        assert!(skipped.is_empty());
        assert_eq!(valid[0].new_match.exchange.user1_gives, "intros");
        assert_eq!(valid[0].new_match.exchange.user2_gets, "");
        assert_eq!(valid[0].user2_name, "Name b");
    }

    #[test]
    fn test_untrusted_fields_are_checked() {
        let users = vec![user("a"), user("b"), user("c"), user("d")];
        let proposals = vec![
            RawProposal::default(),
            proposal("a", "ghost", 8.0),
            proposal("a", "a", 8.0),
            proposal("a", "b", 6.0),
            proposal("a", "b", 10.5),
            RawProposal {
                mutual_score: None,
                ..proposal("c", "d", 0.0)
            },
        ];
        let (valid, skipped) = split(validate_proposals(&proposals, &users));

        assert!(valid.is_empty());
        assert_eq!(
            reasons(&skipped),
            vec![
                SkipReason::MissingField { field: "user1_id" },
                SkipReason::UnknownUser {
                    user_id: "ghost".to_string()
                },
                SkipReason::SelfMatch,
                SkipReason::ScoreOutOfRange { score: 6.0 },
                SkipReason::ScoreOutOfRange { score: 10.5 },
                SkipReason::MissingField {
                    field: "mutual_score"
                },
            ]
        );
    }

    #[test]
    fn test_ids_match_exactly() {
        let users = vec![user("Alice@Example.com"), user("b")];
        let (valid, _) = split(validate_proposals(
            &[proposal("alice@example.com", "b", 8.0)],
            &users,
        ));
        assert!(valid.is_empty());
    }

    #[tokio::test]
    async fn test_one_match_per_person() {
        let store = MemoryMatchStore::new();
        let users = vec![user("a"), user("b"), user("c"), user("d")];
        let proposals = vec![
            proposal("a", "b", 9.0),
            proposal("b", "c", 8.0),
            proposal("c", "d", 10.0),
        ];

        let report = persist_matches(&store, &proposals, &users).await;

        assert_eq!(pairs(&report), vec![["a", "b"], ["c", "d"]]);
        assert_eq!(
            reasons(&report.skipped),
            vec![SkipReason::UserAlreadyMatched {
                user_id: "b".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_pair_does_not_take_its_users() {
        let store = MemoryMatchStore::new();
        let users = vec![user("a"), user("b"), user("c")];
        persist_matches(&store, &[proposal("a", "b", 8.0)], &users).await;

        let report = persist_matches(
            &store,
            &[proposal("a", "b", 8.0), proposal("a", "c", 7.0)],
            &users,
        )
        .await;

        assert_eq!(pairs(&report), vec![["a", "c"]]);
        assert_eq!(reasons(&report.skipped), vec![SkipReason::DuplicatePending]);
        assert_eq!(store.potential_matches().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_take_its_users() {
        let store = MemoryMatchStore::new();
        store.fail_inserts_for("b");
        let users = vec![user("a"), user("b"), user("c")];

        let report = persist_matches(
            &store,
            &[proposal("a", "b", 8.0), proposal("a", "c", 7.0)],
            &users,
        )
        .await;

        assert_eq!(pairs(&report), vec![["a", "c"]]);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::InsertFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_skips_keep_proposal_order() {
        let store = MemoryMatchStore::new();
        let users = vec![user("a"), user("b"), user("c")];
        persist_matches(&store, &[proposal("a", "b", 8.0)], &users).await;

        let report = persist_matches(
            &store,
            &[
                proposal("b", "a", 9.0),
                proposal("a", "ghost", 8.0),
                proposal("c", "c", 8.0),
            ],
            &users,
        )
        .await;

        assert_eq!(
            reasons(&report.skipped),
            vec![
                SkipReason::DuplicatePending,
                SkipReason::UnknownUser {
                    user_id: "ghost".to_string()
                },
                SkipReason::SelfMatch,
            ]
        );
    }

    #[test]
    fn test_skip_reason_serializes_with_kind() {
        let json = serde_json::to_value(SkipReason::UnknownUser {
            user_id: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "unknown_user", "user_id": "x"}));
    }
}
