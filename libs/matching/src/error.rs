//! Error types for match state transitions

use common::error::DatabaseError;
use thiserror::Error;

use crate::model::PotentialMatchStatus;

#[derive(Error, Debug)]
pub enum MatchingError {
    /// No match with the given id
    #[error("Match not found")]
    NotFound,

    /// Acting user is neither party of the match
    #[error("User is not a party to this match")]
    NotParty,

    /// Potential match is no longer pending
    #[error("Match is already {from}")]
    InvalidTransition { from: PotentialMatchStatus },

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

pub type MatchingResult<T> = Result<T, MatchingError>;
