//! Client-side PDF transforms
//!
//! Every operation takes input files as byte buffers and produces new PDF
//! byte streams; inputs are never modified and nothing is retained between
//! calls. All document access goes through the codec adapter in [`codec`].
//!
//! - [`merge_documents`] / [`split_document`]
//! - [`remove_pages`] / [`extract_pages`] (1-based page numbers)
//! - [`images_to_pdf`]
//! - [`compress_document`]

pub mod codec;
pub mod command;
pub mod compress;
pub mod error;
pub mod images;
pub mod input;
pub mod merge;
pub mod pages;
pub mod split;

mod raster;

#[cfg(test)]
mod fixtures;

pub use codec::{ImageHandle, PageRef, PdfDocument};
pub use command::{PdfCommand, ProcessMetrics, ProcessResult};
pub use compress::{compress_document, CompressionLevel};
pub use error::PdfError;
pub use images::images_to_pdf;
pub use input::{ImageFormat, SourceFile};
pub use merge::merge_documents;
pub use pages::{extract_pages, remove_pages};
pub use split::split_document;

use serde::Serialize;

/// Basic facts about a PDF, gathered before running an operation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: u32,
    /// Header version, e.g. "1.7"
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfError> {
    Ok(PdfDocument::load(bytes)?.page_count() as u32)
}

/// Validate a PDF and read its page count and metadata
pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo, PdfError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfError::CorruptDocument(
            "Not a PDF file (missing %PDF- header)".into(),
        ));
    }

    let doc = PdfDocument::load(bytes)?;
    let inner = doc.lopdf();

    Ok(DocumentInfo {
        page_count: doc.page_count() as u32,
        version: inner.version.clone(),
        encrypted: inner.is_encrypted(),
        size_bytes: bytes.len(),
        title: info_string(inner, b"Title"),
        author: info_string(inner, b"Author"),
    })
}

fn info_string(doc: &lopdf::Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        lopdf::Object::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(key).ok()? {
        lopdf::Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Largest page number a range like "1-N" may expand to
pub const MAX_RANGE_PAGE: u32 = 100_000;

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers
pub fn parse_ranges(input: &str) -> Result<Vec<u32>, PdfError> {
    use std::collections::BTreeSet;

    let pages: BTreeSet<u32> = parse_page_sequence(input)?.into_iter().collect();
    Ok(pages.into_iter().collect())
}

/// Parse a page list like "3, 1, 5-6" keeping the written order and any
/// repeats
pub fn parse_page_sequence(input: &str) -> Result<Vec<u32>, PdfError> {
    let mut pages = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            let start = parse_page(start)?;
            let end = parse_page(end)?;

            if start > end {
                return Err(PdfError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }
            if end > MAX_RANGE_PAGE {
                return Err(PdfError::InvalidRange(format!(
                    "Range end {} exceeds {}",
                    end, MAX_RANGE_PAGE
                )));
            }

            pages.extend(start..=end);
        } else {
            // Single page like "5"
            pages.push(parse_page(part)?);
        }

        if pages.len() > MAX_RANGE_PAGE as usize {
            return Err(PdfError::InvalidRange(format!(
                "More than {} pages requested",
                MAX_RANGE_PAGE
            )));
        }
    }

    Ok(pages)
}

fn parse_page(token: &str) -> Result<u32, PdfError> {
    let token = token.trim();
    match token.parse::<u32>() {
        Ok(0) => Err(PdfError::InvalidRange("Page numbers start at 1".into())),
        Ok(page) => Ok(page),
        Err(_) => Err(PdfError::InvalidRange(format!("Invalid page: {}", token))),
    }
}
