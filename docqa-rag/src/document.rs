//! Data types for parsed segments, chunks, search results and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the original upload's file name.
pub const SOURCE_KEY: &str = "source";

/// A unit of parsed text produced by ingestion, such as one PDF page or one
/// spreadsheet sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSegment {
    /// Identifier of the form `{upload_position}:{file_name}#{n}`.
    pub id: String,
    /// The extracted text.
    pub text: String,
    /// Key-value metadata: always `source` and `file_type`, plus `page`,
    /// `slide` or `sheet` when the format has them.
    pub metadata: HashMap<String, String>,
}

impl RawSegment {
    /// The file name of the upload this segment came from.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("Unknown")
    }
}

/// A bounded piece of a [`RawSegment`], the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier of the form `{segment_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent segment plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`RawSegment`].
    pub segment_id: String,
}

impl Chunk {
    /// The file name of the upload this chunk came from.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("Unknown")
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A generated answer together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The model's answer, verbatim.
    pub text: String,
    /// The retrieved context, in the order it was given to the model.
    pub sources: Vec<SearchResult>,
}
