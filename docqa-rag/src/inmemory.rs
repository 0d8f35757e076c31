//! In-memory vector store with a configurable similarity metric.
//!
//! This module provides [`InMemoryVectorStore`], a brute-force store backed by
//! a `Vec` protected by a `tokio::sync::RwLock`. Every search scores every
//! stored chunk, which is plenty for the few thousand chunks a handful of
//! uploaded documents produce.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SimilarityMetric;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Entries {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
    dimensions: Option<usize>,
}

/// An in-memory vector store.
///
/// Chunks are kept in insertion order, so results with equal scores come back
/// in the order they were inserted. All stored embeddings must share one
/// dimension, fixed by the first chunk inserted.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, SimilarityMetric, VectorStore};
///
/// let store = InMemoryVectorStore::new(SimilarityMetric::Cosine);
/// store.upsert(&chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    metric: SimilarityMetric,
    entries: RwLock<Entries>,
}

impl InMemoryVectorStore {
    /// Create a new empty store scoring with `metric`.
    pub fn new(metric: SimilarityMetric) -> Self {
        Self { metric, entries: RwLock::default() }
    }

    /// The metric used to score searches.
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// The embedding dimension of the stored chunks, once any are stored.
    pub async fn dimensions(&self) -> Option<usize> {
        self.entries.read().await.dimensions
    }
}

fn dimension_mismatch(expected: usize, actual: usize, what: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("{what} has dimension {actual}, expected {expected}"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut entries = self.entries.write().await;

        // validate the whole batch before mutating anything
        let mut dimensions = entries.dimensions;
        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("chunk '{}' has no embedding", chunk.id),
                });
            }
            match dimensions {
                Some(expected) if expected != chunk.embedding.len() => {
                    return Err(dimension_mismatch(
                        expected,
                        chunk.embedding.len(),
                        &format!("chunk '{}'", chunk.id),
                    ));
                }
                Some(_) => {}
                None => dimensions = Some(chunk.embedding.len()),
            }
        }
        entries.dimensions = dimensions;

        for chunk in chunks {
            match entries.positions.get(&chunk.id).copied() {
                Some(pos) => entries.chunks[pos] = chunk.clone(),
                None => {
                    let pos = entries.chunks.len();
                    entries.positions.insert(chunk.id.clone(), pos);
                    entries.chunks.push(chunk.clone());
                }
            }
        }
        debug!(
            backend = BACKEND,
            inserted = chunks.len(),
            total = entries.chunks.len(),
            "upserted chunks"
        );
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().await;
        if top_k == 0 || entries.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = entries.dimensions.filter(|&d| d != embedding.len()) {
            return Err(dimension_mismatch(expected, embedding.len(), "query embedding"));
        }

        let mut scored: Vec<SearchResult> = entries
            .chunks
            .iter()
            .map(|chunk| {
                let score = self.metric.score(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        // sort_by is stable, so ties keep insertion order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            segment_id: "doc#0".to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_mixed_dimensions() {
        let store = InMemoryVectorStore::new(SimilarityMetric::Cosine);
        store.upsert(&[chunk("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store.upsert(&[chunk("b", vec![1.0, 0.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert_eq!(store.len().await, 1);

        let err = store.search(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn rejects_missing_embeddings() {
        let store = InMemoryVectorStore::new(SimilarityMetric::Cosine);
        let err = store.upsert(&[chunk("a", Vec::new())]).await.unwrap_err();
        assert!(err.to_string().contains("no embedding"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new(SimilarityMetric::DotProduct);
        let chunks: Vec<_> = ["c", "a", "b"].iter().map(|id| chunk(id, vec![1.0, 1.0])).collect();
        store.upsert(&chunks).await.unwrap();

        let results = store.search(&[1.0, 1.0], 3).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = InMemoryVectorStore::new(SimilarityMetric::Euclidean);
        store.upsert(&[chunk("a", vec![0.0]), chunk("b", vec![5.0])]).await.unwrap();
        store.upsert(&[chunk("a", vec![4.0])]).await.unwrap();

        assert_eq!(store.len().await, 2);
        let results = store.search(&[4.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.id, "a");
        assert_eq!(results[0].score, 0.0);
    }

    #[tokio::test]
    async fn zero_top_k_returns_nothing() {
        let store = InMemoryVectorStore::new(SimilarityMetric::Cosine);
        store.upsert(&[chunk("a", vec![1.0])]).await.unwrap();
        assert!(store.search(&[1.0], 0).await.unwrap().is_empty());
    }
}
