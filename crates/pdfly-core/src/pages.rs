//! Page removal and extraction
//!
//! Both take user-facing 1-based page numbers. Removal is a set difference:
//! numbers that don't name a page select nothing and are skipped. Extraction
//! is a lookup: every number must name a page, and the output follows the
//! request order, duplicates included.

use crate::codec::PdfDocument;
use crate::error::PdfError;
use crate::input::SourceFile;
use std::collections::HashSet;
use tracing::debug;

/// Copy every page NOT listed in `pages`, keeping original relative order.
///
/// Removing every page yields a valid zero-page document.
pub fn remove_pages(file: &SourceFile, pages: &[u32]) -> Result<Vec<u8>, PdfError> {
    let source = file.load_pdf()?;
    let page_count = source.page_count();

    let remove: HashSet<u32> = pages.iter().copied().collect();
    let keep: Vec<usize> = (0..page_count)
        .filter(|&i| !remove.contains(&(i as u32 + 1)))
        .collect();

    let ignored = remove
        .iter()
        .filter(|&&p| p == 0 || p as usize > page_count)
        .count();
    debug!(
        file = %file.name,
        pages = page_count,
        kept = keep.len(),
        ignored,
        "removing pages"
    );

    build_from(&source, &keep)
}

/// Copy only the listed pages, in the order given
pub fn extract_pages(file: &SourceFile, pages: &[u32]) -> Result<Vec<u8>, PdfError> {
    let source = file.load_pdf()?;
    let page_count = source.page_count() as u32;

    let indices = pages
        .iter()
        .map(|&page| to_index(page, page_count))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(file = %file.name, requested = indices.len(), "extracting pages");

    build_from(&source, &indices)
}

/// Convert a 1-based page number to a 0-based codec index
pub fn to_index(page: u32, page_count: u32) -> Result<usize, PdfError> {
    if page == 0 || page > page_count {
        return Err(PdfError::PageIndexOutOfRange { page, page_count });
    }
    Ok(page as usize - 1)
}

fn build_from(source: &PdfDocument, indices: &[usize]) -> Result<Vec<u8>, PdfError> {
    let mut output = PdfDocument::create();
    for page in output.copy_pages(source, indices)? {
        output.add_page(page)?;
    }
    output.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{page_labels, sample_pdf};
    use pretty_assertions::assert_eq;

    fn five_pages() -> SourceFile {
        SourceFile::new("five.pdf", sample_pdf(5, "P"))
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let out = remove_pages(&five_pages(), &[2, 4]).unwrap();
        assert_eq!(page_labels(&out), vec!["P-Page-1", "P-Page-3", "P-Page-5"]);
    }

    #[test]
    fn test_remove_ignores_unknown_pages() {
        let out = remove_pages(&five_pages(), &[0, 3, 9, 3]).unwrap();
        assert_eq!(
            page_labels(&out),
            vec!["P-Page-1", "P-Page-2", "P-Page-4", "P-Page-5"]
        );
    }

    #[test]
    fn test_remove_all_pages_yields_empty_document() {
        let out = remove_pages(&five_pages(), &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(PdfDocument::load(&out).unwrap().page_count(), 0);
    }

    #[test]
    fn test_extract_follows_request_order() {
        let out = extract_pages(&five_pages(), &[3, 1, 2]).unwrap();
        assert_eq!(page_labels(&out), vec!["P-Page-3", "P-Page-1", "P-Page-2"]);
    }

    #[test]
    fn test_extract_duplicates_pages() {
        let out = extract_pages(&five_pages(), &[2, 2]).unwrap();
        assert_eq!(page_labels(&out), vec!["P-Page-2", "P-Page-2"]);
    }

    #[test]
    fn test_extract_out_of_range_fails() {
        let err = extract_pages(&five_pages(), &[1, 6]).unwrap_err();
        assert_eq!(
            err,
            PdfError::PageIndexOutOfRange {
                page: 6,
                page_count: 5
            }
        );
    }

    #[test]
    fn test_extract_page_zero_fails() {
        assert!(matches!(
            extract_pages(&five_pages(), &[0]),
            Err(PdfError::PageIndexOutOfRange { page: 0, .. })
        ));
    }

    #[test]
    fn test_extract_nothing_yields_empty_document() {
        let out = extract_pages(&five_pages(), &[]).unwrap();
        assert_eq!(PdfDocument::load(&out).unwrap().page_count(), 0);
    }
}
