use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docqa_rag::{RagConfig, UploadedFile};

#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your PDF, Word, PowerPoint and Excel documents")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for values otherwise read from the environment.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// OpenAI API key (default: $OPENAI_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Embedding model (default: text-embedding-ada-002)
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,

    /// Chat model used to write answers (default: gpt-3.5-turbo)
    #[arg(long, global = true)]
    pub chat_model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum chunk size in characters
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Number of chunks retrieved per question
    #[arg(long, global = true)]
    pub top_k: Option<usize>,
}

impl ConfigArgs {
    /// Apply the flags that were given on top of `base`, then validate.
    pub fn apply(&self, base: RagConfig) -> docqa_rag::Result<RagConfig> {
        let mut builder = base.into_builder();
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key.as_str());
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model(model.as_str());
        }
        if let Some(model) = &self.chat_model {
            builder = builder.chat_model(model.as_str());
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(size) = self.chunk_size {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        builder.build()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process documents and answer one question
    Ask {
        /// Document to process (repeatable)
        #[arg(short, long = "file", value_name = "PATH", required = true)]
        files: Vec<PathBuf>,

        /// The question to answer
        question: String,
    },

    /// Process documents, then answer questions interactively
    Chat {
        /// Document to process (repeatable)
        #[arg(short, long = "file", value_name = "PATH", required = true)]
        files: Vec<PathBuf>,
    },

    /// List the supported document types
    Formats,
}

/// Read each path into an upload named after the file.
pub fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths.iter().map(|path| read_upload(path)).collect()
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let name = path
        .file_name()
        .with_context(|| format!("{} is not a file", path.display()))?
        .to_string_lossy()
        .into_owned();
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(UploadedFile::new(name, bytes))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_takes_repeated_files_and_global_flags() {
        let cli = Cli::try_parse_from([
            "docqa", "ask", "--file", "a.pdf", "-f", "b.xlsx", "--top-k", "5", "What?",
        ])
        .unwrap();

        assert_eq!(cli.config.top_k, Some(5));
        match cli.command {
            Commands::Ask { files, question } => {
                assert_eq!(files, [PathBuf::from("a.pdf"), PathBuf::from("b.xlsx")]);
                assert_eq!(question, "What?");
            }
            other => panic!("expected ask, got {other:?}"),
        }
    }

    #[test]
    fn ask_requires_a_file() {
        assert!(Cli::try_parse_from(["docqa", "ask", "What?"]).is_err());
    }

    #[test]
    fn flags_override_the_base_config() {
        let args = ConfigArgs {
            api_key: Some("sk-flag".to_string()),
            chunk_size: Some(500),
            chunk_overlap: Some(50),
            ..ConfigArgs::default()
        };
        let base = RagConfig::builder().api_key("sk-env").top_k(4).build().unwrap();

        let config = args.apply(base).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-flag"));
        assert_eq!((config.chunk_size, config.chunk_overlap), (500, 50));
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = ConfigArgs { chunk_overlap: Some(2000), ..ConfigArgs::default() };
        assert!(args.apply(RagConfig::default()).is_err());
    }

    #[test]
    fn uploads_are_named_after_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.PDF");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        let uploads = read_uploads(&[path]).unwrap();

        assert_eq!(uploads[0].name, "Report.PDF");
        assert_eq!(uploads[0].bytes, b"%PDF-1.5");
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = read_uploads(&[PathBuf::from("/nonexistent/plan.docx")]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/plan.docx"));
    }
}
