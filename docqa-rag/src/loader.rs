//! Document ingestion: validate uploads, stage them on disk, and parse them
//! into [`RawSegment`]s.
//!
//! The format parsers work on file paths, so each upload is copied into a
//! scratch file that is removed as soon as its parser returns, even on error.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::document::{RawSegment, SOURCE_KEY};
use crate::error::{RagError, Result};
use crate::extension::{SupportedExtension, extension_of};
use crate::parser::{DocumentParser, ParsedSection, default_parser};

/// An uploaded file: its original name and raw content.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The file name as supplied by the user, including its extension.
    pub name: String,
    /// The file content.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload from a name and its content.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Loads uploaded documents into text segments.
///
/// Each [`SupportedExtension`] maps to exactly one [`DocumentParser`]. The
/// defaults can be replaced with [`DocumentLoader::with_parser`].
#[derive(Clone)]
pub struct DocumentLoader {
    parsers: HashMap<SupportedExtension, Arc<dyn DocumentParser>>,
    max_upload_bytes: usize,
    scratch_dir: Option<PathBuf>,
}

impl fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl DocumentLoader {
    /// Create a loader with the default parsers and the upload limit and
    /// scratch directory from `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        let parsers =
            SupportedExtension::ALL.into_iter().map(|ext| (ext, default_parser(ext))).collect();
        Self {
            parsers,
            max_upload_bytes: config.max_upload_bytes,
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    /// Replace the parser used for one extension.
    pub fn with_parser(
        mut self,
        extension: SupportedExtension,
        parser: Arc<dyn DocumentParser>,
    ) -> Self {
        self.parsers.insert(extension, parser);
        self
    }

    /// Stage scratch files in `dir` instead of the OS temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Load a batch of uploads.
    ///
    /// Every file is validated before any is written to disk, so a batch with
    /// one bad file fails without side effects. Segments are returned in
    /// upload order, and within a file in document order.
    ///
    /// # Errors
    ///
    /// - [`RagError::UnsupportedFileType`] for an extension outside the supported set
    /// - [`RagError::UploadTooLarge`] for a file above the upload limit
    /// - [`RagError::DocumentParseError`] when a parser fails; the batch is abandoned
    /// - [`RagError::IoError`] when a scratch file cannot be created
    pub async fn load(&self, files: &[UploadedFile]) -> Result<Vec<RawSegment>> {
        let mut batch = Vec::with_capacity(files.len());
        for file in files {
            let extension = SupportedExtension::from_file_name(&file.name).ok_or_else(|| {
                RagError::UnsupportedFileType { extension: extension_of(&file.name) }
            })?;
            if file.bytes.len() > self.max_upload_bytes {
                return Err(RagError::UploadTooLarge {
                    file_name: file.name.clone(),
                    size: file.bytes.len(),
                    limit: self.max_upload_bytes,
                });
            }
            batch.push((file, extension));
        }

        let mut segments = Vec::new();
        for (position, (file, extension)) in batch.into_iter().enumerate() {
            segments.extend(self.load_file(position, file, extension).await?);
        }
        Ok(segments)
    }

    async fn load_file(
        &self,
        position: usize,
        file: &UploadedFile,
        extension: SupportedExtension,
    ) -> Result<Vec<RawSegment>> {
        let parser =
            self.parsers.get(&extension).cloned().unwrap_or_else(|| default_parser(extension));
        let scratch = self.stage(file, extension)?;
        debug!(file = %file.name, path = %scratch.path().display(), "parsing upload");

        let parsed = tokio::task::spawn_blocking(move || {
            let result = parser.parse(scratch.path());
            if let Err(e) = scratch.close() {
                warn!(error = %e, "failed to remove scratch file");
            }
            result
        })
        .await;

        let sections = match parsed {
            Ok(Ok(sections)) => sections,
            Ok(Err(e)) => {
                return Err(RagError::DocumentParseError {
                    file_name: file.name.clone(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                return Err(RagError::DocumentParseError {
                    file_name: file.name.clone(),
                    message: format!("parser aborted: {e}"),
                });
            }
        };

        let segments = into_segments(position, &file.name, extension, sections);
        debug!(file = %file.name, segment_count = segments.len(), "parsed upload");
        Ok(segments)
    }

    /// Copy an upload into a uniquely named scratch file with its extension.
    fn stage(&self, file: &UploadedFile, extension: SupportedExtension) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docqa-").suffix(extension.as_str());
        let mut scratch = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        scratch.write_all(&file.bytes)?;
        scratch.flush()?;
        Ok(scratch)
    }
}

/// Segment ids are prefixed with the upload's position in the batch so that
/// two uploads sharing a file name never collide.
fn into_segments(
    position: usize,
    file_name: &str,
    extension: SupportedExtension,
    sections: Vec<ParsedSection>,
) -> Vec<RawSegment> {
    sections
        .into_iter()
        .filter(|section| !section.text.trim().is_empty())
        .enumerate()
        .map(|(i, section)| {
            let mut metadata = HashMap::from([
                (SOURCE_KEY.to_string(), file_name.to_string()),
                ("file_type".to_string(), extension.label().to_string()),
            ]);
            if let Some(location) = &section.location {
                let (key, value) = location.metadata_entry();
                metadata.insert(key.to_string(), value);
            }
            RawSegment {
                id: format!("{position}:{file_name}#{i}"),
                text: section.text,
                metadata,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Location;

    #[test]
    fn blank_sections_are_dropped_and_ids_stay_dense() {
        let sections = vec![
            ParsedSection { text: "first".into(), location: Some(Location::Page(1)) },
            ParsedSection { text: "  \n".into(), location: Some(Location::Page(2)) },
            ParsedSection { text: "third".into(), location: Some(Location::Page(3)) },
        ];

        let segments = into_segments(0, "a.pdf", SupportedExtension::Pdf, sections);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, "0:a.pdf#0");
        assert_eq!(segments[1].id, "0:a.pdf#1");
        assert_eq!(segments[1].metadata["page"], "3");
        assert_eq!(segments[1].metadata["source"], "a.pdf");
        assert_eq!(segments[1].metadata["file_type"], "PDF");
    }

    #[test]
    fn debug_does_not_dump_content() {
        let file = UploadedFile::new("big.pdf", vec![0u8; 4096]);
        assert_eq!(format!("{file:?}"), "UploadedFile { name: \"big.pdf\", bytes: 4096 }");
    }
}
