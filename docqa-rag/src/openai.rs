//! OpenAI embedding and chat providers.
//!
//! Both providers call the REST API directly with `reqwest`. The base URL is
//! configurable, so any OpenAI-compatible endpoint works.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

const PROVIDER: &str = "OpenAI";

/// Largest number of inputs sent in one embeddings request.
pub const MAX_EMBEDDING_BATCH: usize = 1000;

/// Connection details shared by the embedding and chat providers.
#[derive(Clone)]
struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl ApiClient {
    fn from_config(config: &RagConfig) -> std::result::Result<Self, String> {
        let api_key = config.require_api_key().map_err(|e| e.to_string())?.to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// POST `body` to `{base_url}/{path}` and decode the JSON response.
    ///
    /// Failures are returned as a message for the caller to wrap in its own
    /// error variant.
    async fn post<B, R>(&self, path: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, %url, error = %e, "request failed");
                if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout_secs)
                } else {
                    format!("request failed: {e}")
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %url, %status, "API error");
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, %url, error = %e, "failed to parse response");
            if e.is_timeout() {
                format!("request timed out after {}s", self.timeout_secs)
            } else {
                format!("failed to parse response: {e}")
            }
        })
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

fn generation_error(message: impl Into<String>) -> RagError {
    RagError::GenerationError { provider: PROVIDER.into(), message: message.into() }
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_config(&config)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from the key, model, base URL and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no API key is configured.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.require_api_key()?;
        let api = ApiClient::from_config(config).map_err(embedding_error)?;
        Ok(Self { api, model: config.embedding_model.clone() })
    }

    /// The embedding model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest { model: &self.model, input: texts };
        let response: EmbeddingResponse =
            self.api.post("embeddings", &request).await.map_err(embedding_error)?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(embedding_error(format!(
                "API returned {} embeddings for {} inputs",
                data.len(),
                texts.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_request(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBEDDING_BATCH) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// A [`TextGenerator`] backed by the OpenAI chat completions API.
///
/// Each prompt is sent as a single user message.
pub struct OpenAIChatModel {
    api: ApiClient,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model from the key, model, temperature, base URL and
    /// timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no API key is configured.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.require_api_key()?;
        let api = ApiClient::from_config(config).map_err(generation_error)?;
        Ok(Self { api, model: config.chat_model.clone(), temperature: config.temperature })
    }

    /// The chat model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenAIChatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = prompt.len(),
            "chat completion"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        let response: ChatResponse =
            self.api.post("chat/completions", &request).await.map_err(generation_error)?;

        response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| generation_error("API returned no choices"))?
            .message
            .content
            .ok_or_else(|| generation_error("API returned an empty message"))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_require_an_api_key() {
        let config = RagConfig::default();
        assert!(matches!(
            OpenAIEmbeddingProvider::from_config(&config),
            Err(RagError::ConfigError(_))
        ));
        assert!(matches!(OpenAIChatModel::from_config(&config), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = RagConfig::builder()
            .api_key("sk-test")
            .openai_base_url("http://localhost:9999/v1/")
            .build()
            .unwrap();
        let provider = OpenAIEmbeddingProvider::from_config(&config).unwrap();
        assert_eq!(provider.api.base_url, "http://localhost:9999/v1");
        assert_eq!(provider.model(), "text-embedding-ada-002");
    }

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: [ChatMessage { role: "user", content: "hi" }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.0
            })
        );
    }
}
