//! Text generation for customer insights.
//!
//! Provides a `TextGenerator` trait with one implementation:
//! - **Gemini** — single-shot `generateContent` completions
//!
//! One request per call. Failures surface immediately; there is no retry.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

// ============================================================================
// TextGenerator trait
// ============================================================================

/// Abstraction over text completion providers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`. An empty string means the provider produced no text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing API key")]
    MissingApiKey,
}

impl GenerationError {
    /// Provider status code, when the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationError::Api { code, .. } => Some(*code),
            GenerationError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(self) -> String {
        self.candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// GeminiClient
// ============================================================================

/// Gemini text client — calls `models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, GenerationError> {
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: &AiConfig, base_url: String) -> Result<Self, GenerationError> {
        Self::with_api_key(config, config.resolved_api_key(), base_url)
    }

    pub(crate) fn with_api_key(
        config: &AiConfig,
        api_key: Option<String>,
        base_url: String,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.ok_or(GenerationError::MissingApiKey)?;

        // No explicit timeout: requests run under reqwest's defaults.
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(GenerationError::Api { code, message });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        Ok(parsed.text())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> AiConfig {
        AiConfig {
            api_key: Some(api_key.to_string()),
            ..AiConfig::default()
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client = GeminiClient::with_base_url(&test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-api-key"))
            .and(body_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let text = client.generate("hello").await.unwrap();
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn test_generate_concatenates_parts() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiClient::with_base_url(&test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
            })))
            .mount(&mock_server)
            .await;

        assert_eq!(client.generate("x").await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_text() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiClient::with_base_url(&test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&mock_server)
            .await;

        assert_eq!(client.generate("x").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiClient::with_base_url(&test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Resource has been exhausted" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.generate("x").await {
            Err(GenerationError::Api { code, message }) => {
                assert_eq!(code, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiClient::with_base_url(&test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_missing_api_key() {
        let config = test_config("");
        let api_key = config.api_key_or(None);
        let result = GeminiClient::with_api_key(&config, api_key, config.base_url.clone());
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));
    }
}
