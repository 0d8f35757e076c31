//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while processing documents or answering questions.
///
/// Every failure is returned to the caller at the point it happens. Nothing
/// in this crate retries, and a batch that fails leaves no partial state
/// behind.
#[derive(Debug, Error)]
pub enum RagError {
    /// An upload's extension is not one of the supported document types.
    #[error("Unsupported file type: '{extension}'")]
    UnsupportedFileType {
        /// The lower-cased extension including its leading dot, or empty.
        extension: String,
    },

    /// An upload is larger than the configured `max_upload_bytes`.
    #[error("File '{file_name}' is {size} bytes, which exceeds the {limit} byte upload limit")]
    UploadTooLarge {
        /// The upload's file name.
        file_name: String,
        /// The upload's size in bytes.
        size: usize,
        /// The configured limit in bytes.
        limit: usize,
    },

    /// A document's content could not be parsed.
    #[error("Error processing {file_name}: {message}")]
    DocumentParseError {
        /// The upload's file name.
        file_name: String,
        /// The parser's description of the failure.
        message: String,
    },

    /// Indexing was asked to build from zero chunks.
    #[error("No documents to process: the uploaded files produced no text chunks")]
    EmptyInputError,

    /// A question was asked before any documents were processed.
    #[error("Vector store not initialized: process documents before asking questions")]
    IndexNotReadyError,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A scratch file could not be created or written.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A convenience result type for docqa operations.
pub type Result<T> = std::result::Result<T, RagError>;
