//! The per-user session tying ingestion, indexing and answering together.
//!
//! A [`Session`] owns everything one user's conversation needs: the loader,
//! the chunker, the index built from their documents and the answer
//! generator. Sessions share nothing, so two users never see each other's
//! documents.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagConfig, Session, UploadedFile};
//!
//! let mut session = Session::from_config(RagConfig::from_env()?)?;
//! let summary = session.process(&[UploadedFile::new("report.pdf", bytes)]).await?;
//! let answer = session.ask("What was Q3 revenue?").await?;
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::Answer;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extension::SupportedExtension;
use crate::generation::{AnswerGenerator, TextGenerator};
use crate::index::Index;
use crate::loader::{DocumentLoader, UploadedFile};

/// Counts reported by a successful [`Session::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Number of uploaded files.
    pub files: usize,
    /// Number of non-blank segments parsed from them.
    pub segments: usize,
    /// Number of chunks indexed.
    pub chunks: usize,
}

/// One user's document QA session.
///
/// Construct one via [`Session::builder()`] or, with the `openai` feature,
/// [`Session::from_config`].
pub struct Session {
    config: RagConfig,
    loader: DocumentLoader,
    chunker: Arc<dyn Chunker>,
    index: Index,
    generator: AnswerGenerator,
    documents_processed: usize,
    chunk_count: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("documents_processed", &self.documents_processed)
            .field("chunk_count", &self.chunk_count)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a new [`SessionBuilder`].
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Create a session backed by the OpenAI embedding and chat APIs.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `config` is invalid or carries no
    /// API key.
    #[cfg(feature = "openai")]
    pub fn from_config(config: RagConfig) -> Result<Self> {
        use crate::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};

        config.validate()?;
        let embedder = OpenAIEmbeddingProvider::from_config(&config)?;
        let generator = OpenAIChatModel::from_config(&config)?;
        Self::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .text_generator(Arc::new(generator))
            .build()
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Whether documents have been processed successfully and questions can
    /// be asked.
    pub fn is_processed(&self) -> bool {
        self.index.is_ready()
    }

    /// Number of files in the last successful batch.
    pub fn documents_processed(&self) -> usize {
        self.documents_processed
    }

    /// Number of chunks in the index.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// The document types this session accepts.
    pub fn supported_extensions(&self) -> &'static [SupportedExtension] {
        &SupportedExtension::ALL
    }

    /// Ingest, split and index a batch of uploads, replacing anything
    /// processed before.
    ///
    /// The previous index is discarded before any work starts, so after a
    /// failure the session has no documents and [`Session::ask`] fails until
    /// a batch succeeds.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInputError`] if `files` is empty or yields no text
    /// - any ingestion error from [`DocumentLoader::load`]
    /// - any indexing error from [`Index::build`]
    pub async fn process(&mut self, files: &[UploadedFile]) -> Result<ProcessSummary> {
        self.index.clear();
        self.documents_processed = 0;
        self.chunk_count = 0;

        if files.is_empty() {
            return Err(RagError::EmptyInputError);
        }

        let result = self.process_batch(files).await;
        match &result {
            Ok(summary) => {
                self.documents_processed = summary.files;
                self.chunk_count = summary.chunks;
                info!(
                    files = summary.files,
                    segments = summary.segments,
                    chunks = summary.chunks,
                    "processed documents"
                );
            }
            Err(e) => warn!(files = files.len(), error = %e, "document processing failed"),
        }
        result
    }

    async fn process_batch(&mut self, files: &[UploadedFile]) -> Result<ProcessSummary> {
        let segments = self.loader.load(files).await?;
        let chunks = self.chunker.split(&segments);
        let indexed = self.index.build(chunks).await?;
        Ok(ProcessSummary { files: files.len(), segments: segments.len(), chunks: indexed })
    }

    /// Answer `question` from the configured number of most relevant chunks.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotReadyError`] if no batch has been processed
    /// - [`RagError::EmbeddingError`] if the question cannot be embedded
    /// - [`RagError::GenerationError`] if the model call fails
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_top_k(question, self.config.top_k).await
    }

    /// Answer `question` from the `top_k` most relevant chunks.
    pub async fn ask_with_top_k(&self, question: &str, top_k: usize) -> Result<Answer> {
        let context = self.index.query(question, top_k).await?;
        let answer = self.generator.answer(question, context).await?;
        info!(
            sources = answer.sources.len(),
            answer_len = answer.text.len(),
            "answered question"
        );
        Ok(answer)
    }
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    text_generator: Option<Arc<dyn TextGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<DocumentLoader>,
}

impl SessionBuilder {
    /// Set the session configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the model that writes answers.
    pub fn text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    /// Replace the chunker built from the configured size and overlap.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Replace the loader built from the configuration.
    pub fn loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the [`Session`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the configuration is invalid or a
    /// required field is missing.
    pub fn build(self) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let text_generator = self
            .text_generator
            .ok_or_else(|| RagError::ConfigError("text_generator is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };
        let loader = self.loader.unwrap_or_else(|| DocumentLoader::from_config(&config));

        Ok(Session {
            index: Index::new(embedding_provider, config.similarity_metric),
            generator: AnswerGenerator::new(text_generator),
            loader,
            chunker,
            config,
            documents_processed: 0,
            chunk_count: 0,
        })
    }
}
