//! Layered service settings
//!
//! Defaults are compiled in and overridden by `ONEGOODINTRO__*` environment
//! variables, e.g. `ONEGOODINTRO__LLM__MODEL=gpt-4o-mini`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "ONEGOODINTRO";

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_address: String,
}

/// Language model provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

/// Job queue settings shared by the API (enqueue) and the worker (execute)
#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    pub max_attempts: i32,
    pub retry_base_seconds: u64,
    /// Cron expression with a seconds field
    pub poll_schedule: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub jobs: JobSettings,
}

impl Settings {
    /// Build settings from defaults and environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.bind_address", "0.0.0.0:3001")?
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.temperature", 0.3)?
            .set_default("llm.max_tokens", 4000)?
            .set_default("llm.timeout_seconds", 120)?
            .set_default("jobs.max_attempts", 3)?
            .set_default("jobs.retry_base_seconds", 5)?
            .set_default("jobs.poll_schedule", "0/5 * * * * *")?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
