use anyhow::Result;
use docqa_rag::Session;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::render;

const PROMPT: &str = "question> ";

/// Read questions until EOF or Ctrl-C, printing each answer. A failed
/// question is reported and the loop continues.
pub async fn run(session: &Session) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about your documents (Ctrl-D to quit).");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        if let Err(e) = editor.add_history_entry(question) {
            debug!(error = %e, "failed to record history entry");
        }

        match session.ask(question).await {
            Ok(answer) => println!("{}", render::answer(&answer)),
            Err(e) => eprintln!("Error querying documents: {e}"),
        }
    }

    Ok(())
}
