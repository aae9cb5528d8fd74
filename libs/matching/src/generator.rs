//! Calls the language model and parses its proposals

use common::llm::{CompletionRequest, LlmBackend, LlmError};
use common::settings::LlmSettings;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone)]
pub enum GenerateError {
    /// The model call itself failed
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    /// The model answered with something other than a JSON array
    #[error("Model output is not a JSON array: {0}")]
    Parse(String),
}

impl GenerateError {
    /// Retrying the same prompt is worthwhile only for call failures
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerateError::Llm(_))
    }
}

/// One proposal as the model returned it. Every field is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawProposal {
    pub user1_id: Option<String>,
    pub user2_id: Option<String>,
    pub match_type: Option<String>,
    pub mutual_score: Option<f64>,
    pub user1_gives: Option<String>,
    pub user1_gets: Option<String>,
    pub user2_gives: Option<String>,
    pub user2_gets: Option<String>,
    pub rationale: Option<String>,
}

fn text_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn score_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl RawProposal {
    /// Lenient decode: wrongly typed fields become `None`, and a non-object
    /// element becomes an empty proposal the persister will skip.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return RawProposal::default();
        };

        RawProposal {
            user1_id: text_field(object, "user1_id"),
            user2_id: text_field(object, "user2_id"),
            match_type: text_field(object, "match_type"),
            mutual_score: score_field(object, "mutual_score"),
            user1_gives: text_field(object, "user1_gives"),
            user1_gets: text_field(object, "user1_gets"),
            user2_gives: text_field(object, "user2_gives"),
            user2_gets: text_field(object, "user2_gets"),
            rationale: text_field(object, "rationale"),
        }
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^(?:```[A-Za-z]*)?\s*(.*?)\s*(?:```)?$").ok())
        .as_ref()
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` marker and a trailing
/// ```` ``` ```` marker, each if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    fence_pattern()
        .and_then(|pattern| pattern.captures(trimmed))
        .and_then(|captures| captures.get(1))
        .map_or(trimmed, |inner| inner.as_str())
}

/// Parse model output into proposals. `[]` is a valid empty result.
pub fn parse_proposals(text: &str) -> Result<Vec<RawProposal>, GenerateError> {
    let cleaned = strip_code_fences(text);
    let document: Value =
        serde_json::from_str(cleaned).map_err(|e| GenerateError::Parse(e.to_string()))?;

    match document {
        Value::Array(items) => Ok(items.iter().map(RawProposal::from_value).collect()),
        other => Err(GenerateError::Parse(format!(
            "expected an array, found {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Sends prompts to a model backend with the configured sampling settings
#[derive(Clone)]
pub struct MatchGenerator {
    backend: Arc<dyn LlmBackend>,
    temperature: f32,
    max_tokens: u32,
}

impl MatchGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    pub fn from_settings(backend: Arc<dyn LlmBackend>, settings: &LlmSettings) -> Self {
        Self {
            backend,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<Vec<RawProposal>, GenerateError> {
        let request = CompletionRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let text = self.backend.complete(request).await?;
        match parse_proposals(&text) {
            Ok(proposals) => {
                info!(
                    model = self.backend.id(),
                    proposals = proposals.len(),
                    "Model returned proposals"
                );
                Ok(proposals)
            }
            Err(e) => {
                warn!(model = self.backend.id(), error = %e, "Model output could not be parsed");
                Err(e)
            }
        }
    }
}
