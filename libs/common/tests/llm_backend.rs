//! Integration tests for the OpenAI-compatible backend against a mock server

use std::time::Duration;

use common::llm::{CompletionRequest, LlmBackend, LlmError, OpenAiBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer, api_key: Option<&str>) -> OpenAiBackend {
    OpenAiBackend::new(
        format!("{}/v1", server.uri()),
        "test-model",
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("client should build")
}

#[tokio::test]
async fn test_completion_returns_first_choice_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "temperature": 0.3,
            "max_tokens": 4000,
            "messages": [{"role": "user", "content": "match these people"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "```json\n[]\n```"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Some("secret"));
    let text = backend
        .complete(CompletionRequest::new("match these people"))
        .await
        .expect("completion should succeed");

    assert_eq!(text, "```json\n[]\n```");
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let result = backend.complete(CompletionRequest::new("prompt")).await;

    assert!(matches!(result, Err(LlmError::RateLimited)));
}

#[tokio::test]
async fn test_server_error_is_request_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let result = backend.complete(CompletionRequest::new("prompt")).await;

    match result {
        Err(LlmError::RequestFailed(message)) => assert!(message.contains("upstream exploded")),
        other => panic!("expected request failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let result = backend.complete(CompletionRequest::new("prompt")).await;

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}
