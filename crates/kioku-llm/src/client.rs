// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI REST API.
//!
//! Provides [`OpenAiClient`] covering chat completions, embeddings, and
//! audio transcription, with authentication, bounded input truncation, and
//! transient error retry.

use std::time::Duration;

use kioku_analysis::{TimeContext, TimeProvider};
use kioku_config::model::OpenAiConfig;
use kioku_core::{ChatMessage, KiokuError, MemoryHit, StepStatus};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::context;
use crate::types::{
    ApiErrorResponse, ApiMessage, ChatCompletionRequest, ChatCompletionResponse,
    EmbeddingRequest, EmbeddingResponse, TranscriptionResponse,
};

/// Fixed reply substituted when the model fails or returns empty content.
pub const APOLOGY_REPLY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Embedding inputs are truncated to this many characters.
const EMBEDDING_INPUT_CHARS: usize = 8000;

/// Client-wide timeout; also bounds transcription uploads.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-request timeout for chat completions.
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-request timeout for embeddings, which should return fast.
const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling temperature for chat completions.
const CHAT_TEMPERATURE: f32 = 0.7;

/// Token budget for one chat completion.
const CHAT_MAX_TOKENS: u32 = 2000;

/// A reply plus the outcome tag for the generation step.
#[derive(Debug, Clone)]
pub struct GeneratedReply {
    pub text: String,
    pub status: StepStatus,
}

/// HTTP client for OpenAI API communication.
///
/// Manages the bearer header, connection pooling, and retry for
/// transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
    transcription_model: String,
    configured: bool,
    max_retries: u32,
}

impl OpenAiClient {
    /// Creates a client from configuration.
    ///
    /// A missing API key does not fail construction: the client is built
    /// unauthenticated, every call fails, and the degrade policy of the
    /// callers applies. `is_configured` reports the distinction.
    pub fn new(config: &OpenAiConfig) -> Result<Self, KiokuError> {
        let configured = config.api_key.is_some();
        let key = config.api_key.clone().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| KiokuError::Config(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| KiokuError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimensions: config.embedding_dimensions,
            transcription_model: config.transcription_model.clone(),
            configured,
            max_retries: 1,
        })
    }

    /// True when an API key was supplied at construction.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Embedding vector dimensionality (also the zero-vector length).
    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sends one chat completion request and returns the reply text.
    pub async fn chat_completion(&self, messages: Vec<ApiMessage>) -> Result<String, KiokuError> {
        let request = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        };

        let body = self
            .post_json("/v1/chat/completions", &request, CHAT_TIMEOUT)
            .await?;
        let response: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| KiokuError::Provider {
                message: format!("failed to parse chat completion response: {e}"),
                source: Some(Box::new(e)),
            })?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| KiokuError::Provider {
                message: "chat completion returned no choices".to_string(),
                source: None,
            })
    }

    /// Computes an embedding for `text`, truncated to a bounded length.
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>, KiokuError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: context::truncate(text, EMBEDDING_INPUT_CHARS),
        };

        let body = self
            .post_json("/v1/embeddings", &request, EMBEDDING_TIMEOUT)
            .await?;
        let response: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| KiokuError::Provider {
                message: format!("failed to parse embedding response: {e}"),
                source: Some(Box::new(e)),
            })?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| KiokuError::Provider {
                message: "embedding response contained no vectors".to_string(),
                source: None,
            })
    }

    /// Degrade-to-default wrapper around [`create_embedding`](Self::create_embedding):
    /// on failure returns a zero vector of the expected dimensionality.
    ///
    /// The zero vector matches nothing meaningfully in similarity search,
    /// so the failure is tagged `Degraded` and logged instead of hidden.
    pub async fn embedding_or_zero(&self, text: &str) -> (Vec<f32>, StepStatus) {
        match self.create_embedding(text).await {
            Ok(embedding) => (embedding, StepStatus::Ok),
            Err(e) => {
                warn!(error = %e, "embedding failed, substituting zero vector");
                (vec![0.0; self.embedding_dimensions], StepStatus::Degraded)
            }
        }
    }

    /// Transcribes an audio file via the transcription endpoint.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
    ) -> Result<String, KiokuError> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| KiokuError::Provider {
                message: format!("failed to build multipart body: {e}"),
                source: Some(Box::new(e)),
            })?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| KiokuError::Provider {
                message: format!("transcription request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(KiokuError::Provider {
                message: api_error_message(status, &body),
                source: None,
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| KiokuError::Provider {
                message: format!("failed to parse transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.text)
    }

    /// Liveness probe against the models listing endpoint.
    pub async fn health_check(&self) -> bool {
        if !self.configured {
            return false;
        }
        match self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "openai health check failed");
                false
            }
        }
    }

    /// Builds the context window and produces a reply for one turn.
    ///
    /// Never errors: a failed call or empty model output yields the fixed
    /// apology string tagged `Degraded`.
    pub async fn generate_response(
        &self,
        user_message: &str,
        memories: &[MemoryHit],
        history: &[ChatMessage],
        time: &TimeContext,
        time_provider: &TimeProvider,
    ) -> GeneratedReply {
        let context_block =
            context::build_context(user_message, memories, history, time, time_provider);

        let messages = vec![
            ApiMessage {
                role: "system".to_string(),
                content: context::SYSTEM_PROMPT.to_string(),
            },
            ApiMessage {
                role: "system".to_string(),
                content: format!("Context: {context_block}"),
            },
            ApiMessage {
                role: "user".to_string(),
                content: user_message.to_string(),
            },
        ];

        match self.chat_completion(messages).await {
            Ok(text) if !text.trim().is_empty() => GeneratedReply {
                text,
                status: StepStatus::Ok,
            },
            Ok(_) => {
                warn!("chat completion returned empty content, substituting apology");
                GeneratedReply {
                    text: APOLOGY_REPLY.to_string(),
                    status: StepStatus::Degraded,
                }
            }
            Err(e) => {
                warn!(error = %e, "chat completion failed, substituting apology");
                GeneratedReply {
                    text: APOLOGY_REPLY.to_string(),
                    status: StepStatus::Degraded,
                }
            }
        }
    }

    /// POSTs a JSON body and returns the response text.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second
    /// delay. Client errors propagate immediately. `timeout` bounds each
    /// attempt separately.
    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        request: &T,
        timeout: Duration,
    ) -> Result<String, KiokuError> {
        let url = format!("{}{path}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, path, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .timeout(timeout)
                .json(request)
                .send()
                .await
                .map_err(|e| KiokuError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, path, "response received");

            if status.is_success() {
                return response.text().await.map_err(|e| KiokuError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(KiokuError::Provider {
                    message: api_error_message(status, &body),
                    source: None,
                });
                continue;
            }

            return Err(KiokuError::Provider {
                message: api_error_message(status, &body),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| KiokuError::Provider {
            message: "request failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

/// Formats a remote error body, preferring the structured envelope.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!(
            "OpenAI API error ({}): {}",
            api_err.error.type_.unwrap_or_else(|| status.to_string()),
            api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> OpenAiConfig {
        OpenAiConfig {
            api_key: Some("sk-test".into()),
            ..OpenAiConfig::default()
        }
    }

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new(&test_config())
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ]
        })
    }

    #[tokio::test]
    async fn chat_completion_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Hi there!")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let reply = client
            .chat_completion(vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }])
            .await
            .unwrap();
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn chat_completion_retries_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limited", "type": "rate_limit_error"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("After retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let reply = client
            .chat_completion(vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }])
            .await
            .unwrap();
        assert_eq!(reply, "After retry");
    }

    #[tokio::test]
    async fn chat_completion_fails_on_400_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Bad model", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .chat_completion(vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn create_embedding_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let embedding = client.create_embedding("hello world").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embedding_or_zero_degrades_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let (embedding, status) = client.embedding_or_zero("hello").await;
        assert_eq!(embedding.len(), client.embedding_dimensions());
        assert!(embedding.iter().all(|&v| v == 0.0));
        assert_eq!(status, StepStatus::Degraded);
    }

    #[tokio::test]
    async fn generate_response_substitutes_apology_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let provider = TimeProvider::new("UTC");
        let time = provider.now_context();
        let reply = client
            .generate_response("hello", &[], &[], &time, &provider)
            .await;
        assert_eq!(reply.text, APOLOGY_REPLY);
        assert_eq!(reply.status, StepStatus::Degraded);
    }

    #[tokio::test]
    async fn generate_response_substitutes_apology_on_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("   ")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let provider = TimeProvider::new("UTC");
        let time = provider.now_context();
        let reply = client
            .generate_response("hello", &[], &[], &time, &provider)
            .await;
        assert_eq!(reply.text, APOLOGY_REPLY);
        assert_eq!(reply.status, StepStatus::Degraded);
    }

    #[tokio::test]
    async fn transcribe_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "hello from audio"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let text = client
            .transcribe(vec![1, 2, 3], "clip.wav")
            .await
            .unwrap();
        assert_eq!(text, "hello from audio");
    }

    #[tokio::test]
    async fn health_check_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.health_check().await);

        let unconfigured = OpenAiClient::new(&OpenAiConfig::default())
            .unwrap()
            .with_base_url(server.uri());
        assert!(!unconfigured.health_check().await);
    }
}
