//! Text extraction for uploaded documents.
//!
//! Plain text is decoded as UTF-8, PDFs go through `pdf-extract`, and DOCX
//! files are read straight from `word/document.xml` inside the archive.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type")]
    Unsupported,
    #[error("Error processing TXT: {0}")]
    Text(#[from] std::string::FromUtf8Error),
    #[error("Error processing PDF: {0}")]
    Pdf(String),
    #[error("Error processing DOCX: {0}")]
    Docx(String),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Picks the extractor from the file extension, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let filename = filename.to_ascii_lowercase();
        if filename.ends_with(".txt") {
            Some(DocumentKind::Text)
        } else if filename.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if filename.ends_with(".docx") {
            Some(DocumentKind::Docx)
        } else {
            None
        }
    }
}

/// Extracts the text of an uploaded file off the async runtime.
pub async fn extract_upload(filename: &str, bytes: Vec<u8>) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_filename(filename).ok_or(ExtractError::Unsupported)?;
    debug!(filename, ?kind, size = bytes.len(), "extracting upload");

    // pdf-extract can panic on damaged input
    tokio::task::spawn_blocking(move || extract_text(kind, bytes))
        .await
        .unwrap_or_else(|join_err| {
            let reason = format!("extraction aborted: {}", join_err);
            Err(match kind {
                DocumentKind::Docx => ExtractError::Docx(reason),
                _ => ExtractError::Pdf(reason),
            })
        })
}

pub fn extract_text(kind: DocumentKind, bytes: Vec<u8>) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Text => Ok(String::from_utf8(bytes)?),
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        DocumentKind::Docx => docx_text(&bytes).map_err(|e| ExtractError::Docx(e.to_string())),
    }
}

#[derive(Debug, Error)]
enum DocxError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

/// Collects `<w:t>` runs, one line per `<w:p>` paragraph.
fn docx_text(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                text.push_str(&t.decode().map_err(quick_xml::Error::from)?);
            }
            Event::GeneralRef(r) if in_run_text => {
                if let Some(ch) = r.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let name = r.decode().map_err(quick_xml::Error::from)?;
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
