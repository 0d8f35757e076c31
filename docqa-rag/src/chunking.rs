//! Splitting segments into overlapping, bounded chunks.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! prefers to cut at paragraph breaks, then sentence or line breaks, then word
//! breaks, and only cuts mid-word when a window has no separator at all.

use crate::config::RagConfig;
use crate::document::{Chunk, RawSegment};
use crate::error::{RagError, Result};

/// A strategy for splitting segments into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the index.
pub trait Chunker: Send + Sync {
    /// Split one segment into chunks.
    ///
    /// Returns an empty `Vec` if the segment has no non-whitespace text.
    fn chunk(&self, segment: &RawSegment) -> Vec<Chunk>;

    /// Split a list of segments, preserving their order.
    fn split(&self, segments: &[RawSegment]) -> Vec<Chunk> {
        segments.iter().flat_map(|segment| self.chunk(segment)).collect()
    }
}

/// Separator tiers, tried in order. Within a tier the rightmost cut wins.
const SEPARATOR_TIERS: [&[&str]; 3] = [&["\n\n"], &[". ", "! ", "? ", "\n"], &[" ", "\t"]];

/// Splits text into windows of at most `chunk_size` characters, with exactly
/// `chunk_overlap` characters shared between consecutive chunks.
///
/// Chunk IDs are generated as `{segment_id}_{chunk_index}`. Each chunk inherits
/// the parent segment's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.split(&segments);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker using the configured size and overlap.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// The maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        // byte offset of every char boundary, including the end of the string
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let len = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                chunks.push(text[bounds[start]..].to_string());
                break;
            }
            let end = self.find_cut(text, &bounds, start);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            start = end - self.chunk_overlap;
        }
        chunks
    }

    /// Choose the cut for the window starting at char `start`. The result lies
    /// in `(start + chunk_overlap, start + chunk_size]`.
    fn find_cut(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let floor = start + self.chunk_overlap;
        let window = &text[bounds[start]..bounds[limit]];

        for tier in SEPARATOR_TIERS {
            let cut = tier
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
                .map(|byte_end| start + window[..byte_end].chars().count())
                .filter(|&end| end > floor)
                .max();
            if let Some(end) = cut {
                return end;
            }
        }
        limit
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, segment: &RawSegment) -> Vec<Chunk> {
        if segment.text.trim().is_empty() {
            return Vec::new();
        }

        self.split_text(&segment.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = segment.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", segment.id),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    segment_id: segment.id.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn segment(id: &str, text: &str) -> RawSegment {
        RawSegment {
            id: id.to_string(),
            text: text.to_string(),
            metadata: HashMap::from([("source".to_string(), "a.pdf".to_string())]),
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(RecursiveChunker::new(0, 0), Err(RagError::ConfigError(_))));
        assert!(matches!(RecursiveChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(RecursiveChunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&segment("a.pdf#0", "The capital of France is Paris."));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "a.pdf#0_0");
        assert_eq!(chunks[0].segment_id, "a.pdf#0");
        assert_eq!(chunks[0].metadata["chunk_index"], "0");
        assert_eq!(chunks[0].metadata["source"], "a.pdf");
        assert!(chunks[0].embedding.is_empty());
    }

    #[test]
    fn blank_segments_produce_nothing() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&segment("x", "")).is_empty());
        assert!(chunker.chunk(&segment("x", " \n\t ")).is_empty());
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let chunker = RecursiveChunker::new(20, 0).unwrap();
        let chunks = chunker.split_text("First para. Here\n\nSecond para");
        assert_eq!(chunks, ["First para. Here\n\n", "Second para"]);
    }

    #[test]
    fn falls_back_to_sentence_then_word_breaks() {
        let chunker = RecursiveChunker::new(12, 0).unwrap();
        assert_eq!(chunker.split_text("One two. Three four"), ["One two. ", "Three four"]);
        assert_eq!(chunker.split_text("alpha beta gamma"), ["alpha beta ", "gamma"]);
    }

    #[test]
    fn hard_cuts_when_there_is_no_separator() {
        let chunker = RecursiveChunker::new(4, 1).unwrap();
        assert_eq!(chunker.split_text("abcdefghij"), ["abcd", "defg", "ghij"]);
    }

    #[test]
    fn separator_inside_overlap_is_ignored() {
        // the only space sits within the first `overlap` chars, so the cut is hard
        let chunker = RecursiveChunker::new(6, 3).unwrap();
        assert_eq!(chunker.split_text("a bcdefgh"), ["a bcde", "cdefgh"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunker = RecursiveChunker::new(3, 1).unwrap();
        let chunks = chunker.split_text("ééééé");
        assert_eq!(chunks, ["ééé", "ééé"]);
    }

    #[test]
    fn split_preserves_segment_order() {
        let chunker = RecursiveChunker::new(100, 10).unwrap();
        let segments = [segment("a#0", "first"), segment("a#1", " "), segment("b#0", "second")];
        let chunks = chunker.split(&segments);
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a#0_0", "b#0_0"]);
    }
}
