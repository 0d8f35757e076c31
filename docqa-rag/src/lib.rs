//! # docqa-rag
//!
//! Question answering over a user's own documents.
//!
//! Uploaded PDF, Word, PowerPoint and Excel files are parsed into text,
//! split into overlapping chunks and embedded into an in-memory vector index.
//! Questions are answered by retrieving the most relevant chunks and asking a
//! language model to answer from them alone.
//!
//! ## Features
//!
//! - `openai` (default): [`openai::OpenAIEmbeddingProvider`],
//!   [`openai::OpenAIChatModel`] and [`Session::from_config`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docqa_rag::{RagConfig, Session, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> docqa_rag::Result<()> {
//!     let mut session = Session::from_config(RagConfig::from_env()?)?;
//!     let bytes = std::fs::read("report.pdf")?;
//!     session.process(&[UploadedFile::new("report.pdf", bytes)]).await?;
//!
//!     let answer = session.ask("What was Q3 revenue?").await?;
//!     println!("{}", answer.text);
//!     for source in &answer.sources {
//!         println!("{}: {}", source.chunk.source(), source.chunk.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extension;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod parser;
pub mod session;
pub mod vectorstore;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{API_KEY_VAR, RagConfig, RagConfigBuilder, SimilarityMetric};
pub use document::{Answer, Chunk, RawSegment, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extension::SupportedExtension;
pub use generation::{AnswerGenerator, TextGenerator, build_prompt};
pub use index::Index;
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, UploadedFile};
pub use parser::{DocumentParser, Location, ParseError, ParsedSection};
pub use session::{ProcessSummary, Session, SessionBuilder};
pub use vectorstore::VectorStore;
