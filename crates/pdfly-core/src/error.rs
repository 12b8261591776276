use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PdfError {
    #[error("Failed to parse document: {0}")]
    CorruptDocument(String),

    /// `page` is the 1-based page number the caller asked for
    #[error("Page {page} does not exist (document has {page_count} pages)")]
    PageIndexOutOfRange { page: u32, page_count: u32 },

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Operation needs at least {required} files, got {provided}")]
    InsufficientInput { required: usize, provided: usize },

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PdfError {
    /// Stable machine-readable code for result payloads
    pub fn code(&self) -> &'static str {
        match self {
            PdfError::CorruptDocument(_) => "CORRUPT_DOCUMENT",
            PdfError::PageIndexOutOfRange { .. } => "PAGE_INDEX_OUT_OF_RANGE",
            PdfError::UnsupportedImageFormat(_) => "UNSUPPORTED_IMAGE_FORMAT",
            PdfError::InsufficientInput { .. } => "INSUFFICIENT_INPUT",
            PdfError::InvalidRange(_) => "INVALID_RANGE",
            PdfError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Prefix parse failures with the name of the file they came from
    pub(crate) fn in_file(self, name: &str) -> Self {
        match self {
            PdfError::CorruptDocument(msg) => {
                PdfError::CorruptDocument(format!("{}: {}", name, msg))
            }
            PdfError::UnsupportedImageFormat(msg) => {
                PdfError::UnsupportedImageFormat(format!("{}: {}", name, msg))
            }
            other => other,
        }
    }
}
