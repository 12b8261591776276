//! Image to PDF conversion

use crate::codec::PdfDocument;
use crate::error::PdfError;
use crate::input::SourceFile;
use tracing::debug;

/// Package JPEG/PNG images into one PDF, one image per page, each page sized
/// to its image's pixel dimensions. An unsupported or unreadable image fails
/// the whole batch.
pub fn images_to_pdf(files: &[SourceFile]) -> Result<Vec<u8>, PdfError> {
    if files.is_empty() {
        return Err(PdfError::InsufficientInput {
            required: 1,
            provided: 0,
        });
    }

    let mut doc = PdfDocument::create();
    for file in files {
        let format = file.image_format()?;
        let image = doc
            .embed_image(&file.bytes, format)
            .map_err(|e| e.in_file(&file.name))?;
        debug!(
            file = %file.name,
            width = image.width(),
            height = image.height(),
            "adding image page"
        );
        doc.add_image_page(image)?;
    }

    doc.save()
}
