//! One full generation run: select, prompt, generate, persist

use serde::Serialize;
use tracing::info;

use crate::eligibility::load_eligible_users;
use crate::generator::{GenerateError, MatchGenerator};
use crate::persister::{GenerationReport, persist_matches};
use crate::prompt::build_prompt;
use crate::store::MatchStore;

pub const INSUFFICIENT_USERS_MESSAGE: &str = "Need at least 2 users for matching";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    /// Fewer than two eligible users; the model was not called
    InsufficientUsers {
        message: String,
        eligible_users: usize,
    },
    Completed(GenerationReport),
}

/// Run the pipeline once. Model call and parse failures are returned as
/// errors; per-proposal failures land in the report.
pub async fn run_generation(
    store: &dyn MatchStore,
    generator: &MatchGenerator,
) -> Result<GenerationOutcome, GenerateError> {
    let users = load_eligible_users(store).await;
    if users.len() < 2 {
        info!(eligible = users.len(), "Not enough users for matching");
        return Ok(GenerationOutcome::InsufficientUsers {
            message: INSUFFICIENT_USERS_MESSAGE.to_string(),
            eligible_users: users.len(),
        });
    }

    let prompt = build_prompt(&users);
    let proposals = generator.generate(&prompt).await?;
    let report = persist_matches(store, &proposals, &users).await;

    Ok(GenerationOutcome::Completed(report))
}
