//! # docqa
//!
//! Ask questions about your own documents from the command line.
//!
//! ## Commands
//!
//! - `docqa ask --file <PATH>... <QUESTION>`: process documents and answer one question
//! - `docqa chat --file <PATH>...`: process documents, then answer questions interactively
//! - `docqa formats`: list the supported document types
//!
//! Configuration is read from the environment (and a `.env` file, if present),
//! with command-line flags taking precedence. `OPENAI_API_KEY` must be set or
//! passed with `--api-key`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use docqa_rag::{RagConfig, Session};
use tracing_subscriber::EnvFilter;

mod cli;
mod render;
mod repl;

use cli::{Cli, Commands};

const DEFAULT_LOG_FILTER: &str = "warn,docqa_rag=info,docqa=info";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let files = match &cli.command {
        Commands::Formats => {
            print!("{}", render::formats(&docqa_rag::SupportedExtension::ALL));
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Ask { files, .. } | Commands::Chat { files } => files,
    };

    let config = cli.config.apply(RagConfig::from_env()?)?;
    let mut session = Session::from_config(config)?;
    let uploads = match cli::read_uploads(files) {
        Ok(uploads) => uploads,
        Err(e) => {
            eprintln!("Error processing documents: {e:#}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match session.process(&uploads).await {
        Ok(summary) => println!("{}", render::processed(&summary)),
        Err(e) => {
            eprintln!("Error processing documents: {e}");
            return Ok(ExitCode::FAILURE);
        }
    }

    match &cli.command {
        Commands::Ask { question, .. } => match session.ask(question).await {
            Ok(answer) => {
                print!("{}", render::answer(&answer));
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Error querying documents: {e}");
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Chat { .. } => {
            repl::run(&session).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Formats => Ok(ExitCode::SUCCESS),
    }
}
