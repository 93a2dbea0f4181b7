use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::DocxError;

/// Main document part inside the package
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the document's text: non-empty paragraphs, trimmed, joined by
/// single spaces
pub fn extract_text(path: &Path) -> Result<String, DocxError> {
    Ok(extract_paragraphs(path)?.join(" "))
}

/// Extract trimmed, non-empty paragraphs in document order
pub fn extract_paragraphs(path: &Path) -> Result<Vec<String>, DocxError> {
    let file = File::open(path).map_err(|source| DocxError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let paragraphs = read_paragraphs(BufReader::new(file))?;
    if paragraphs.is_empty() {
        warn!(path = %path.display(), "The document is empty");
    } else {
        debug!(path = %path.display(), paragraphs = paragraphs.len(), "extract_paragraphs: done");
    }
    Ok(paragraphs)
}

/// Read paragraphs from any seekable .docx byte source
pub fn read_paragraphs<R: Read + Seek>(reader: R) -> Result<Vec<String>, DocxError> {
    let mut archive = ZipArchive::new(reader)?;

    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(ZipError::FileNotFound) => {
            return Err(DocxError::MissingPart(DOCUMENT_PART.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    parse_document_xml(&xml)
}

/// Elements whose paragraphs are not part of the body text: text boxes,
/// the duplicate fallback copy of alternate content, and tables
const SKIPPED_ELEMENTS: [&[u8]; 3] = [b"w:txbxContent", b"mc:Fallback", b"w:tbl"];

/// Collect body paragraph text from WordprocessingML.
///
/// Text comes from `w:t` runs; `w:tab` becomes a tab and `w:br`/`w:cr` a
/// space. Text boxes and tables are skipped, so each paragraph holds only
/// its own runs.
pub fn parse_document_xml(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut skip_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if is_skipped(e.name().as_ref()) => skip_depth += 1,
            Ok(Event::End(ref e)) if is_skipped(e.name().as_ref()) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocxError::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ if skip_depth > 0 => {}
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    if depth == 0 {
                        current.clear();
                    }
                    depth += 1;
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" if depth > 0 => current.push('\t'),
                b"w:br" | b"w:cr" if depth > 0 => current.push(' '),
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text && depth > 0 => {
                let text = t.unescape().map_err(|e| DocxError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let trimmed = current.trim();
                        if !trimmed.is_empty() {
                            paragraphs.push(trimmed.to_string());
                        }
                        current.clear();
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn is_skipped(name: &[u8]) -> bool {
    SKIPPED_ELEMENTS.iter().any(|skipped| *skipped == name)
}
