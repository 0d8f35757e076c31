//! The searchable index built from a session's chunks.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::SimilarityMetric;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

/// Embeds chunks and answers similarity queries over them.
///
/// An index starts out not ready. [`Index::build`] replaces its whole content,
/// and a failed build leaves it not ready rather than half-filled.
pub struct Index {
    provider: Arc<dyn EmbeddingProvider>,
    metric: SimilarityMetric,
    store: Option<InMemoryVectorStore>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("provider", &self.provider.name())
            .field("metric", &self.metric)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Index {
    /// Create an empty index that embeds with `provider` and scores with `metric`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, metric: SimilarityMetric) -> Self {
        Self { provider, metric, store: None }
    }

    /// Whether a build has succeeded since the last [`Index::clear`].
    pub fn is_ready(&self) -> bool {
        self.store.is_some()
    }

    /// Number of indexed chunks; zero when not ready.
    pub async fn len(&self) -> usize {
        match &self.store {
            Some(store) => store.len().await,
            None => 0,
        }
    }

    /// Drop all indexed chunks and mark the index not ready.
    pub fn clear(&mut self) {
        self.store = None;
    }

    /// Embed `chunks` and make them searchable, replacing previous contents.
    ///
    /// Returns the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInputError`] if `chunks` is empty
    /// - [`RagError::EmbeddingError`] if embedding fails or returns the wrong
    ///   number of vectors
    /// - [`RagError::VectorStoreError`] if the embeddings disagree on dimension
    ///   or two chunks share an id
    pub async fn build(&mut self, mut chunks: Vec<Chunk>) -> Result<usize> {
        self.store = None;
        if chunks.is_empty() {
            return Err(RagError::EmptyInputError);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.provider.embed_batch(&texts).await.inspect_err(|e| {
            error!(provider = self.provider.name(), error = %e, "chunk embedding failed");
        })?;

        if embeddings.len() != chunks.len() {
            error!(
                provider = self.provider.name(),
                expected = chunks.len(),
                actual = embeddings.len(),
                "embedding count mismatch"
            );
            return Err(RagError::EmbeddingError {
                provider: self.provider.name().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let store = InMemoryVectorStore::new(self.metric);
        store.upsert(&chunks).await?;
        let count = store.len().await;
        if count != chunks.len() {
            error!(expected = chunks.len(), actual = count, "duplicate chunk ids in build");
            return Err(RagError::VectorStoreError {
                backend: "InMemory".to_string(),
                message: format!(
                    "expected {} distinct chunks, stored {count}; chunk ids must be unique",
                    chunks.len()
                ),
            });
        }
        self.store = Some(store);

        info!(chunk_count = count, metric = %self.metric, "index built");
        Ok(count)
    }

    /// Return up to `k` chunks most similar to `question`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotReadyError`] if no build has succeeded.
    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let store = self.store.as_ref().ok_or(RagError::IndexNotReadyError)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed(question).await.inspect_err(|e| {
            error!(provider = self.provider.name(), error = %e, "question embedding failed");
        })?;
        store.search(&embedding, k).await
    }
}
