use blogpilot::config::AppConfig;
use blogpilot::llm::{GeminiClient, GenerativeModel};
use blogpilot::utils::GenerationError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GeminiClient {
    let mut config = AppConfig::default().generator;
    config.api_url = format!("{}/v1beta/", server.uri());
    config.api_key = "test-key".to_string();
    GeminiClient::new(config).unwrap()
}

#[tokio::test]
async fn sends_prompt_with_generation_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "hello" }] }],
            "generationConfig": { "topK": 40, "maxOutputTokens": 8192 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "[{\"title\":" }, { "text": "\"X\"}]" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate("hello").await.unwrap();
    assert_eq!(text, "[{\"title\":\"X\"}]");
}

#[tokio::test]
async fn quota_error_is_rate_limited_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "status": "RESOURCE_EXHAUSTED",
                "details": [{ "retryDelay": "12s" }]
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server).generate("hello").await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 429, .. }));
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(12)));
}

#[tokio::test]
async fn blank_candidates_are_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client(&server).generate("hello").await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
}
