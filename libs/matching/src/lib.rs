//! Mutual-matching pipeline for OneGoodIntro
//!
//! Eligible users are selected, rendered into a model prompt, the model's
//! proposals are parsed and validated, and valid pairs are stored as pending
//! potential matches. Administrators confirm them into confirmed matches,
//! which both parties then accept or decline.
//!
//! Storage sits behind the [`store::MatchStore`] trait so the pipeline can be
//! exercised against [`store::MemoryMatchStore`] in tests.

pub mod acceptance;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod model;
pub mod persister;
pub mod pipeline;
pub mod prompt;
pub mod review;
pub mod store;
pub mod transformer;

pub use error::{MatchingError, MatchingResult};
pub use generator::{GenerateError, MatchGenerator, RawProposal};
pub use pipeline::{GenerationOutcome, run_generation};
pub use store::{MatchStore, PgMatchStore};
