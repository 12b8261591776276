//! Input files handed over by the caller

use crate::codec::PdfDocument;
use crate::error::PdfError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raster formats that can be packaged into a PDF page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Map a declared MIME type to a format
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// Guess the format from a file name's extension
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// A named byte buffer with an optional declared MIME type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    #[serde(default)]
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// File name without directory or extension, used to name outputs
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
    }

    /// Resolve the image format: the declared media type wins, otherwise the
    /// extension decides.
    pub fn image_format(&self) -> Result<ImageFormat, PdfError> {
        match &self.media_type {
            Some(media_type) => ImageFormat::from_media_type(media_type).ok_or_else(|| {
                PdfError::UnsupportedImageFormat(format!("{}: {}", self.name, media_type))
            }),
            None => ImageFormat::from_extension(&self.name).ok_or_else(|| {
                PdfError::UnsupportedImageFormat(format!("{}: unknown image type", self.name))
            }),
        }
    }

    pub(crate) fn load_pdf(&self) -> Result<PdfDocument, PdfError> {
        PdfDocument::load(&self.bytes).map_err(|e| e.in_file(&self.name))
    }
}
