//! Classification of uploads by file extension.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A document type accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedExtension {
    /// `.pdf`
    Pdf,
    /// `.docx`
    Word,
    /// `.pptx`
    PowerPoint,
    /// `.xlsx`
    Excel,
}

impl SupportedExtension {
    /// Every supported extension, in display order.
    pub const ALL: [SupportedExtension; 4] = [Self::Pdf, Self::Word, Self::PowerPoint, Self::Excel];

    /// The extension including its leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Word => ".docx",
            Self::PowerPoint => ".pptx",
            Self::Excel => ".xlsx",
        }
    }

    /// Human-readable document type, used as the `file_type` metadata value.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Word => "Word",
            Self::PowerPoint => "PowerPoint",
            Self::Excel => "Excel",
        }
    }

    /// Look up a lower- or mixed-case extension such as `.PDF` or `docx`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.');
        Self::ALL.into_iter().find(|e| e.as_str()[1..].eq_ignore_ascii_case(extension))
    }

    /// Classify an upload by the extension of its file name.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = extension_of(file_name);
        if extension.is_empty() {
            return None;
        }
        Self::from_extension(&extension)
    }
}

impl fmt::Display for SupportedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lower-cased extension of `file_name` including its dot, or an empty
/// string when the name has none.
///
/// Only the final path component is considered, and a leading dot (as in
/// `.env`) does not start an extension.
pub fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(pos) if pos > 0 => base[pos..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_supported_names_case_insensitively() {
        assert_eq!(SupportedExtension::from_file_name("report.pdf"), Some(SupportedExtension::Pdf));
        assert_eq!(SupportedExtension::from_file_name("REPORT.PDF"), Some(SupportedExtension::Pdf));
        assert_eq!(SupportedExtension::from_file_name("a.b.Docx"), Some(SupportedExtension::Word));
        assert_eq!(
            SupportedExtension::from_file_name("deck.pptx"),
            Some(SupportedExtension::PowerPoint)
        );
        assert_eq!(SupportedExtension::from_file_name("q3.xlsx"), Some(SupportedExtension::Excel));
    }

    #[test]
    fn rejects_other_names() {
        assert_eq!(SupportedExtension::from_file_name("notes.txt"), None);
        assert_eq!(SupportedExtension::from_file_name("legacy.doc"), None);
        assert_eq!(SupportedExtension::from_file_name("pdf"), None);
        assert_eq!(SupportedExtension::from_file_name(".pdf"), None);
    }

    #[test]
    fn extension_of_handles_edge_cases() {
        assert_eq!(extension_of("notes.TXT"), ".txt");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".env"), "");
        assert_eq!(extension_of("dir.v2/file"), "");
        assert_eq!(extension_of("C:\\docs\\plan.Pdf"), ".pdf");
    }

    #[test]
    fn labels_match_document_types() {
        let labels: Vec<_> = SupportedExtension::ALL.iter().map(|e| e.label()).collect();
        assert_eq!(labels, ["PDF", "Word", "PowerPoint", "Excel"]);
    }
}
