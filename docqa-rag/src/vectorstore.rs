//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for embedded [`Chunk`]s with similarity search.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, SimilarityMetric, VectorStore};
///
/// let store = InMemoryVectorStore::new(SimilarityMetric::Cosine);
/// store.upsert(&chunks).await?;
/// let results = store.search(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks, replacing any stored chunk with the same ID. Chunks must
    /// have embeddings set.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// The number of stored chunks.
    async fn len(&self) -> usize;

    /// Whether the store holds no chunks.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
