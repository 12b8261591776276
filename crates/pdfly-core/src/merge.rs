//! PDF Merge
//!
//! Concatenates documents: pages in file order, then page order within each
//! file.

use crate::codec::PdfDocument;
use crate::error::PdfError;
use crate::input::SourceFile;
use tracing::debug;

/// Merge two or more PDFs into one
///
/// The algorithm:
/// 1. Reject fewer than two inputs before touching any bytes
/// 2. Create an empty destination document
/// 3. For each source, in order, copy every page and append it
/// 4. Serialize the destination
pub fn merge_documents(files: &[SourceFile]) -> Result<Vec<u8>, PdfError> {
    if files.len() < 2 {
        return Err(PdfError::InsufficientInput {
            required: 2,
            provided: files.len(),
        });
    }

    let mut merged = PdfDocument::create();

    for file in files {
        let source = file.load_pdf()?;
        let indices: Vec<usize> = (0..source.page_count()).collect();
        debug!(file = %file.name, pages = indices.len(), "appending document");

        for page in merged.copy_pages(&source, &indices)? {
            merged.add_page(page)?;
        }
    }

    merged.save()
}
