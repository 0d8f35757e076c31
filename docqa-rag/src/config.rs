//! Configuration for document processing and question answering.
//!
//! A [`RagConfig`] is built once at startup, either through
//! [`RagConfig::builder()`] or from the environment with
//! [`RagConfig::from_env()`]. Both paths run the same validation, so an
//! inconsistent setting (for example an overlap that is not smaller than the
//! chunk size) is rejected before any document is touched.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Environment variable holding the OpenAI API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const EMBEDDING_MODEL_VAR: &str = "DOCQA_EMBEDDING_MODEL";
const CHAT_MODEL_VAR: &str = "DOCQA_CHAT_MODEL";
const TEMPERATURE_VAR: &str = "DOCQA_TEMPERATURE";
const CHUNK_SIZE_VAR: &str = "DOCQA_CHUNK_SIZE";
const CHUNK_OVERLAP_VAR: &str = "DOCQA_CHUNK_OVERLAP";
const TOP_K_VAR: &str = "DOCQA_TOP_K";
const SIMILARITY_METRIC_VAR: &str = "DOCQA_SIMILARITY_METRIC";
const OPENAI_BASE_URL_VAR: &str = "DOCQA_OPENAI_BASE_URL";
const REQUEST_TIMEOUT_VAR: &str = "DOCQA_REQUEST_TIMEOUT_SECS";
const MAX_UPLOAD_BYTES_VAR: &str = "DOCQA_MAX_UPLOAD_BYTES";
const SCRATCH_DIR_VAR: &str = "DOCQA_SCRATCH_DIR";

/// The default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// How the index scores a stored vector against a query vector.
///
/// Every metric is oriented so that a larger score means "more relevant".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    /// Cosine of the angle between the two vectors.
    #[default]
    Cosine,
    /// Raw inner product.
    DotProduct,
    /// Negated Euclidean (L2) distance.
    Euclidean,
}

impl SimilarityMetric {
    /// Score `a` against `b`. Larger is more similar.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                dot / (norm_a * norm_b)
            }
            Self::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Self::Euclidean => {
                -a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dot-product",
            Self::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot-product" | "dot_product" | "dot" | "inner-product" => Ok(Self::DotProduct),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(RagError::ConfigError(format!(
                "unknown similarity metric '{other}' (expected cosine, dot-product or euclidean)"
            ))),
        }
    }
}

/// Configuration parameters for ingestion, retrieval and generation.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Secret used to authenticate against the embedding and chat services.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Chat model identifier.
    pub chat_model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Scoring used by the index.
    pub similarity_metric: SimilarityMetric,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Timeout applied to every embedding and generation request.
    pub request_timeout_secs: u64,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Directory for transient upload copies. `None` uses the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            similarity_metric: SimilarityMetric::Cosine,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            request_timeout_secs: 60,
            max_upload_bytes: 50 * 1024 * 1024,
            scratch_dir: None,
        }
    }
}

impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("similarity_metric", &self.similarity_metric)
            .field("openai_base_url", &self.openai_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults. See [`RagConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable cannot be parsed or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = RagConfig::builder();

        if let Some(key) = get(API_KEY_VAR) {
            builder = builder.api_key(key.trim());
        }
        if let Some(model) = get(EMBEDDING_MODEL_VAR) {
            builder = builder.embedding_model(model.trim());
        }
        if let Some(model) = get(CHAT_MODEL_VAR) {
            builder = builder.chat_model(model.trim());
        }
        if let Some(value) = get(TEMPERATURE_VAR) {
            builder = builder.temperature(parse_var(TEMPERATURE_VAR, &value)?);
        }
        if let Some(value) = get(CHUNK_SIZE_VAR) {
            builder = builder.chunk_size(parse_var(CHUNK_SIZE_VAR, &value)?);
        }
        if let Some(value) = get(CHUNK_OVERLAP_VAR) {
            builder = builder.chunk_overlap(parse_var(CHUNK_OVERLAP_VAR, &value)?);
        }
        if let Some(value) = get(TOP_K_VAR) {
            builder = builder.top_k(parse_var(TOP_K_VAR, &value)?);
        }
        if let Some(value) = get(SIMILARITY_METRIC_VAR) {
            builder = builder.similarity_metric(value.parse()?);
        }
        if let Some(url) = get(OPENAI_BASE_URL_VAR) {
            builder = builder.openai_base_url(url.trim());
        }
        if let Some(value) = get(REQUEST_TIMEOUT_VAR) {
            builder = builder.request_timeout_secs(parse_var(REQUEST_TIMEOUT_VAR, &value)?);
        }
        if let Some(value) = get(MAX_UPLOAD_BYTES_VAR) {
            builder = builder.max_upload_bytes(parse_var(MAX_UPLOAD_BYTES_VAR, &value)?);
        }
        if let Some(dir) = get(SCRATCH_DIR_VAR) {
            builder = builder.scratch_dir(dir.trim());
        }

        builder.build()
    }

    /// Convert this configuration back into a builder for further overrides.
    pub fn into_builder(self) -> RagConfigBuilder {
        RagConfigBuilder { config: self }
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `temperature` is outside `0.0..=2.0`
    /// - a model name or the base URL is empty
    /// - `request_timeout_secs == 0` or `max_upload_bytes == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(RagError::ConfigError("embedding_model must not be empty".to_string()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(RagError::ConfigError("chat_model must not be empty".to_string()));
        }
        if self.openai_base_url.trim().is_empty() {
            return Err(RagError::ConfigError("openai_base_url must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(RagError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(RagError::ConfigError(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the API key, or a [`RagError::ConfigError`] explaining how to set one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            RagError::ConfigError(format!(
                "an OpenAI API key is required: set {API_KEY_VAR} or pass --api-key"
            ))
        })
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RagError::ConfigError(format!("invalid value '{value}' for {name}: {e}")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the API key used for the embedding and chat services.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the chat model identifier.
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the similarity metric used by the index.
    pub fn similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.config.similarity_metric = metric;
        self
    }

    /// Set the base URL of the OpenAI-compatible API.
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into();
        self
    }

    /// Set the per-request timeout for embedding and generation calls.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the largest accepted upload in bytes.
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Set the directory used for transient upload copies.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
