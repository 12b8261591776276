use crate::compress::{compress_document, CompressionLevel};
use crate::error::PdfError;
use crate::images::images_to_pdf;
use crate::input::SourceFile;
use crate::merge::merge_documents;
use crate::pages::{extract_pages, remove_pages};
use crate::split::split_document;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<SourceFile>,
    },
    Split {
        file: SourceFile,
    },
    RemovePages {
        file: SourceFile,
        pages: Vec<u32>,
    },
    ExtractPages {
        file: SourceFile,
        pages: Vec<u32>,
    },
    ImagesToPdf {
        files: Vec<SourceFile>,
    },
    Compress {
        file: SourceFile,
        #[serde(default)]
        level: CompressionLevel,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF outputs; one entry except for split
    pub data: Vec<String>,
    pub error: Option<String>,
    /// Machine-readable error code
    pub code: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub output_count: usize,
    pub processing_time_ms: u64,
}

impl PdfCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::Split { .. } => "split",
            PdfCommand::RemovePages { .. } => "remove-pages",
            PdfCommand::ExtractPages { .. } => "extract-pages",
            PdfCommand::ImagesToPdf { .. } => "images-to-pdf",
            PdfCommand::Compress { .. } => "compress",
        }
    }

    /// File names for `count` outputs of this command
    pub fn output_names(&self, count: usize) -> Vec<String> {
        match self {
            PdfCommand::Merge { .. } => vec!["merged.pdf".to_string()],
            PdfCommand::ImagesToPdf { .. } => vec!["images_to_pdf.pdf".to_string()],
            PdfCommand::Split { file } => (1..=count)
                .map(|n| format!("{}-page-{}.pdf", file.stem(), n))
                .collect(),
            PdfCommand::RemovePages { file, .. }
            | PdfCommand::ExtractPages { file, .. }
            | PdfCommand::Compress { file, .. } => {
                vec![format!("{}-{}.pdf", file.stem(), self.name())]
            }
        }
    }

    fn input_size(&self) -> usize {
        match self {
            PdfCommand::Merge { files } | PdfCommand::ImagesToPdf { files } => {
                files.iter().map(|f| f.bytes.len()).sum()
            }
            PdfCommand::Split { file }
            | PdfCommand::RemovePages { file, .. }
            | PdfCommand::ExtractPages { file, .. }
            | PdfCommand::Compress { file, .. } => file.bytes.len(),
        }
    }

    /// Run the operation, returning raw output documents
    pub fn run(&self) -> Result<Vec<Vec<u8>>, PdfError> {
        match self {
            PdfCommand::Merge { files } => merge_documents(files).map(|pdf| vec![pdf]),
            PdfCommand::Split { file } => split_document(file),
            PdfCommand::RemovePages { file, pages } => {
                remove_pages(file, pages).map(|pdf| vec![pdf])
            }
            PdfCommand::ExtractPages { file, pages } => {
                extract_pages(file, pages).map(|pdf| vec![pdf])
            }
            PdfCommand::ImagesToPdf { files } => images_to_pdf(files).map(|pdf| vec![pdf]),
            PdfCommand::Compress { file, level } => {
                compress_document(file, *level).map(|pdf| vec![pdf])
            }
        }
    }

    /// Run the operation and fold success or failure into a serializable result
    pub fn execute(&self) -> ProcessResult {
        let started = Instant::now();
        match self.run() {
            Ok(outputs) => ProcessResult {
                success: true,
                metrics: Some(ProcessMetrics {
                    input_size_bytes: self.input_size(),
                    output_size_bytes: outputs.iter().map(Vec::len).sum(),
                    output_count: outputs.len(),
                    processing_time_ms: started.elapsed().as_millis() as u64,
                }),
                data: outputs.iter().map(|pdf| BASE64.encode(pdf)).collect(),
                error: None,
                code: None,
            },
            Err(e) => {
                warn!(operation = self.name(), error = %e, "PDF operation failed");
                ProcessResult {
                    success: false,
                    data: Vec::new(),
                    error: Some(e.to_string()),
                    code: Some(e.code().to_string()),
                    metrics: None,
                }
            }
        }
    }
}
