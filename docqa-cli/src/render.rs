//! Plain-text rendering of session results for the terminal.

use std::fmt::Write;

use docqa_rag::{Answer, ProcessSummary, SupportedExtension};

/// Counts parsed documents (pages, slides, sheets), not uploaded files.
pub fn processed(summary: &ProcessSummary) -> String {
    format!("Processed {} documents into {} chunks", summary.segments, summary.chunks)
}

/// The answer followed by a numbered list of the chunks it was drawn from.
pub fn answer(answer: &Answer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Answer:\n{}", answer.text.trim());
    if !answer.sources.is_empty() {
        let _ = writeln!(out, "\nSources:");
        for (i, source) in answer.sources.iter().enumerate() {
            let _ = writeln!(out, "\nSource {}: {}", i + 1, source.chunk.source());
            let _ = writeln!(out, "{}", source.chunk.text.trim());
        }
    }
    out
}

pub fn formats(extensions: &[SupportedExtension]) -> String {
    extensions.iter().map(|ext| format!("{:<6} {}\n", ext.as_str(), ext.label())).collect()
}
