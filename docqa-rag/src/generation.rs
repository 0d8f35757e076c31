//! Prompt assembly and answer generation over retrieved context.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::{Answer, SearchResult};
use crate::error::{RagError, Result};

const INSTRUCTION: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// A language model that completes a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` and return the model's text verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// A short name for logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Build the prompt that "stuffs" every retrieved chunk into a single request.
///
/// The chunks appear in the given order, separated by blank lines, between
/// the instruction and the question.
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let context =
        context.iter().map(|result| result.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{INSTRUCTION}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

/// Answers questions from retrieved chunks with a [`TextGenerator`].
#[derive(Clone)]
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator").field("generator", &self.generator.name()).finish()
    }
}

impl AnswerGenerator {
    /// Create an answer generator backed by `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Answer `question` from `context`, returning the context as the sources.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the model call fails. Failures
    /// of any other kind are reported under the generator's name as well.
    pub async fn answer(&self, question: &str, context: Vec<SearchResult>) -> Result<Answer> {
        let prompt = build_prompt(question, &context);
        debug!(
            generator = self.generator.name(),
            context_chunks = context.len(),
            prompt_len = prompt.len(),
            "generating answer"
        );

        let text = self.generator.generate(&prompt).await.map_err(|e| {
            error!(generator = self.generator.name(), error = %e, "answer generation failed");
            match e {
                RagError::GenerationError { .. } => e,
                other => RagError::GenerationError {
                    provider: self.generator.name().to_string(),
                    message: other.to_string(),
                },
            }
        })?;

        Ok(Answer { text, sources: context })
    }
}
