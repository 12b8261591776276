//! Lossless PDF compression
//!
//! Levels are cumulative:
//! - `Low`: load and re-serialize
//! - `Medium`: drop unreferenced objects and Flate-compress uncompressed streams
//! - `High`: also strip document metadata
//!
//! Page count, order and content are unchanged at every level.

use crate::error::PdfError;
use crate::input::SourceFile;
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl std::str::FromStr for CompressionLevel {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CompressionLevel::Low),
            "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            other => Err(PdfError::InvalidRange(format!(
                "unknown compression level: {}",
                other
            ))),
        }
    }
}

pub fn compress_document(file: &SourceFile, level: CompressionLevel) -> Result<Vec<u8>, PdfError> {
    let mut doc = file.load_pdf()?;
    let inner = doc.lopdf_mut();

    if level >= CompressionLevel::High {
        strip_metadata(inner);
    }
    if level >= CompressionLevel::Medium {
        let pruned = inner.prune_objects();
        inner.renumber_objects();
        inner.compress();
        debug!(file = %file.name, pruned = pruned.len(), "compressed streams");
    }

    let bytes = doc.save()?;
    debug!(
        file = %file.name,
        ?level,
        before = file.bytes.len(),
        after = bytes.len(),
        "compression finished"
    );
    Ok(bytes)
}

/// Remove the `/Info` dictionary and the catalog's XMP `/Metadata` stream.
/// Both become unreferenced and are dropped by pruning.
fn strip_metadata(doc: &mut Document) {
    doc.trailer.remove(b"Info");
    if let Ok(catalog_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        if let Ok(catalog) = doc.get_dictionary_mut(catalog_id) {
            catalog.remove(b"Metadata");
        }
    }
}
