//! PDF Split
//!
//! Explodes a document into one single-page document per source page.

use crate::codec::PdfDocument;
use crate::error::PdfError;
use crate::input::SourceFile;
use tracing::debug;

/// Split a PDF into single-page PDFs, in source page order.
///
/// A zero-page document yields an empty result.
pub fn split_document(file: &SourceFile) -> Result<Vec<Vec<u8>>, PdfError> {
    let source = file.load_pdf()?;
    let page_count = source.page_count();
    debug!(file = %file.name, pages = page_count, "splitting document");

    let mut outputs = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let mut single = PdfDocument::create();
        for page in single.copy_pages(&source, &[index])? {
            single.add_page(page)?;
        }
        outputs.push(single.save()?);
    }

    Ok(outputs)
}
