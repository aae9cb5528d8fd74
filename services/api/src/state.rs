//! Application state shared across handlers

use common::jobs::JobQueue;
use common::settings::JobSettings;
use matching::{MatchGenerator, MatchStore};
use std::sync::Arc;

use crate::middleware::JwtVerifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub generator: MatchGenerator,
    pub jobs: JobQueue,
    pub job_settings: JobSettings,
    pub jwt: JwtVerifier,
}
