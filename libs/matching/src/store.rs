//! Persistence seam for the matching pipeline

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::model::{
    AcceptanceSlot, CandidateProfile, ConfirmedMatch, NewNotification, NewPotentialMatch,
    Notification, PartyAcceptance, PartyProfile, PotentialMatch, PotentialMatchStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryMatchStore;
pub use postgres::PgMatchStore;

/// Storage operations used by the pipeline, the acceptance state machine and
/// administrative review. Every write is a single-row statement.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Users with a non-empty current focus, with their claims and requests
    async fn matching_candidates(&self) -> DatabaseResult<Vec<CandidateProfile>>;

    /// Whether a pending potential match exists for the unordered pair
    async fn pending_pair_exists(&self, user_a: &str, user_b: &str) -> DatabaseResult<bool>;

    async fn insert_potential_match(&self, new: &NewPotentialMatch)
    -> DatabaseResult<PotentialMatch>;

    async fn get_potential_match(&self, id: Uuid) -> DatabaseResult<Option<PotentialMatch>>;

    /// Newest first, with the total count for the filter
    async fn list_potential_matches(
        &self,
        status: Option<PotentialMatchStatus>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<PotentialMatch>, i64)>;

    /// Move a pending potential match to `to`. Returns `None` when the row
    /// is missing or no longer pending.
    async fn transition_potential_match(
        &self,
        id: Uuid,
        to: PotentialMatchStatus,
    ) -> DatabaseResult<Option<PotentialMatch>>;

    /// Copy the parties of a potential match into a new confirmed match
    async fn insert_confirmed_match(
        &self,
        potential: &PotentialMatch,
    ) -> DatabaseResult<ConfirmedMatch>;

    async fn get_confirmed_match(&self, id: Uuid) -> DatabaseResult<Option<ConfirmedMatch>>;

    /// Confirmed matches where the user is any of the four party columns
    async fn confirmed_matches_for_user(&self, user_id: &str)
    -> DatabaseResult<Vec<ConfirmedMatch>>;

    /// Set a party's acceptance flag, keeping an existing timestamp, and
    /// stamp `completed_at` in the same write when the other party has
    /// already accepted. Returns `None` when the match does not exist.
    async fn accept_party(
        &self,
        id: Uuid,
        slot: AcceptanceSlot,
    ) -> DatabaseResult<Option<PartyAcceptance>>;

    async fn delete_confirmed_match(&self, id: Uuid) -> DatabaseResult<bool>;

    /// Display profiles for the given user ids; unknown ids are omitted
    async fn profiles(&self, user_ids: &[String]) -> DatabaseResult<Vec<PartyProfile>>;

    async fn insert_notification(&self, new: &NewNotification) -> DatabaseResult<Notification>;
}
