//! Document parsers for the supported upload types.
//!
//! Every parser reads a file from disk and returns its text as a list of
//! [`ParsedSection`]s. The heavy lifting is delegated to format crates:
//!
//! - [`PdfParser`]: `lopdf` page by page, with a `pdf-extract` fallback
//! - [`DocxParser`]: `docx-rs`
//! - [`PptxParser`]: `zip` + `quick-xml` over the slide parts
//! - [`XlsxParser`]: `calamine`
//!
//! Parsers are synchronous; the loader runs them on the blocking pool.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use calamine::Reader as _;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::debug;

use crate::extension::SupportedExtension;

/// A parser failure, described in the parser's own words.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    /// Create a parse error from any displayable cause.
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}

/// Where in its document a section was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// 1-based PDF page number.
    Page(u32),
    /// 1-based slide number.
    Slide(u32),
    /// Worksheet name.
    Sheet(String),
}

impl Location {
    /// The metadata key and value recorded for this location.
    pub fn metadata_entry(&self) -> (&'static str, String) {
        match self {
            Self::Page(n) => ("page", n.to_string()),
            Self::Slide(n) => ("slide", n.to_string()),
            Self::Sheet(name) => ("sheet", name.clone()),
        }
    }
}

/// A piece of text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    /// The extracted text.
    pub text: String,
    /// Position within the document, if the format has one.
    pub location: Option<Location>,
}

/// The capability to turn a document file into text.
pub trait DocumentParser: Send + Sync {
    /// Parse the file at `path`.
    fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>, ParseError>;
}

/// Return the default parser for a supported extension.
pub fn default_parser(extension: SupportedExtension) -> Arc<dyn DocumentParser> {
    match extension {
        SupportedExtension::Pdf => Arc::new(PdfParser),
        SupportedExtension::Word => Arc::new(DocxParser),
        SupportedExtension::PowerPoint => Arc::new(PptxParser),
        SupportedExtension::Excel => Arc::new(XlsxParser),
    }
}

/// Extracts one section per PDF page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>, ParseError> {
        let document = lopdf::Document::load(path)
            .map_err(|e| ParseError::new(format!("failed to load PDF: {e}")))?;

        let mut sections = Vec::new();
        for page_number in document.get_pages().into_keys() {
            match document.extract_text(&[page_number]) {
                Ok(text) => sections.push(ParsedSection {
                    text,
                    location: Some(Location::Page(page_number)),
                }),
                Err(e) => debug!(page_number, error = %e, "no extractable text on page"),
            }
        }

        if sections.iter().all(|s| s.text.trim().is_empty()) {
            // lopdf cannot decode every font encoding; pdf-extract handles more of them
            debug!("page-level extraction was empty, falling back to whole-document extraction");
            let text = pdf_extract::extract_text(path)
                .map_err(|e| ParseError::new(format!("failed to extract PDF text: {e}")))?;
            return Ok(vec![ParsedSection { text, location: None }]);
        }

        Ok(sections)
    }
}

/// Extracts the paragraph text of a Word document as a single section.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>, ParseError> {
        let data = std::fs::read(path)?;
        let docx = docx_rs::read_docx(&data)
            .map_err(|e| ParseError::new(format!("failed to read Word document: {e}")))?;

        let mut text = String::new();
        for child in docx.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            match child {
                                docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => text.push('\t'),
                                _ => {}
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(vec![ParsedSection { text, location: None }])
    }
}

/// Extracts one section per slide of a PowerPoint presentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxParser;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

fn slide_number(part_name: &str) -> Option<u32> {
    part_name.strip_prefix(SLIDE_PREFIX)?.strip_suffix(".xml")?.parse().ok()
}

impl DocumentParser for PptxParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>, ParseError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ParseError::new(format!("failed to open presentation: {e}")))?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_unstable_by_key(|(n, _)| *n);

        let mut sections = Vec::with_capacity(slides.len());
        for (number, part_name) in slides {
            let mut xml = String::new();
            archive
                .by_name(&part_name)
                .map_err(|e| ParseError::new(format!("failed to read {part_name}: {e}")))?
                .read_to_string(&mut xml)?;

            let text = slide_text(&xml)?;
            if !text.is_empty() {
                sections.push(ParsedSection { text, location: Some(Location::Slide(number)) });
            }
        }

        Ok(sections)
    }
}

/// Collect the `<a:t>` runs of a slide, one line per `<a:p>` paragraph.
fn slide_text(xml: &str) -> Result<String, ParseError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(ParseError::new)?;
                line.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        lines.push(trimmed.to_string());
                    }
                    line.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::new(format!(
                    "malformed slide XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }

    Ok(lines.join("\n"))
}

/// Extracts one section per non-empty worksheet of an Excel workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxParser;

impl DocumentParser for XlsxParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>, ParseError> {
        let mut workbook = calamine::open_workbook_auto(path)
            .map_err(|e| ParseError::new(format!("failed to open workbook: {e}")))?;

        let mut sections = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| ParseError::new(format!("failed to read sheet '{sheet_name}': {e}")))?;

            let mut text = String::new();
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                if cells.iter().all(String::is_empty) {
                    continue;
                }
                text.push_str(&cells.join(" | "));
                text.push('\n');
            }

            if !text.is_empty() {
                sections.push(ParsedSection { text, location: Some(Location::Sheet(sheet_name)) });
            }
        }

        Ok(sections)
    }
}

fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.to_string(),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_numbers_parse_only_slide_parts() {
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn slide_text_keeps_one_line_per_paragraph() {
        let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
            <p:sp><p:txBody>
              <a:p><a:r><a:t>Quarterly</a:t></a:r><a:r><a:t> results</a:t></a:r></a:p>
              <a:p><a:r><a:t>Revenue &amp; margin</a:t></a:r></a:p>
              <a:p></a:p>
            </p:txBody></p:sp>
        </p:spTree></p:cSld></p:sld>"#;

        assert_eq!(slide_text(xml).unwrap(), "Quarterly results\nRevenue & margin");
    }

    #[test]
    fn slide_text_ignores_text_outside_runs() {
        let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:nvPr>ignored</p:nvPr><a:p><a:r><a:t>kept</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(slide_text(xml).unwrap(), "kept");
    }

    #[test]
    fn location_metadata_entries() {
        assert_eq!(Location::Page(3).metadata_entry(), ("page", "3".to_string()));
        assert_eq!(Location::Slide(1).metadata_entry(), ("slide", "1".to_string()));
        assert_eq!(
            Location::Sheet("Q3".to_string()).metadata_entry(),
            ("sheet", "Q3".to_string())
        );
    }
}
