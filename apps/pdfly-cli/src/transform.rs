//! File-based front end for the PDF transforms

use crate::Command;
use anyhow::{bail, Context, Result};
use pdfly_core::{inspect, parse_page_sequence, parse_ranges, PdfCommand, SourceFile};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub async fn run(command: Command) -> Result<()> {
    let (pdf_command, output) = match command {
        Command::Merge { files, output } => (
            PdfCommand::Merge {
                files: read_all(&files).await?,
            },
            output_target(output, &files),
        ),
        Command::Split { file, out_dir } => {
            let target = out_dir.map(OutputTarget::Dir);
            let cmd = PdfCommand::Split {
                file: read_source(&file).await?,
            };
            (cmd, target.unwrap_or_else(|| beside(&file)))
        }
        Command::Remove {
            file,
            pages,
            output,
        } => (
            PdfCommand::RemovePages {
                file: read_source(&file).await?,
                pages: parse_ranges(&pages)?,
            },
            output_target(output, std::slice::from_ref(&file)),
        ),
        Command::Extract {
            file,
            pages,
            output,
        } => (
            PdfCommand::ExtractPages {
                file: read_source(&file).await?,
                pages: parse_page_sequence(&pages)?,
            },
            output_target(output, std::slice::from_ref(&file)),
        ),
        Command::Images { files, output } => (
            PdfCommand::ImagesToPdf {
                files: read_all(&files).await?,
            },
            output_target(output, &files),
        ),
        Command::Compress {
            file,
            level,
            output,
        } => (
            PdfCommand::Compress {
                file: read_source(&file).await?,
                level,
            },
            output_target(output, std::slice::from_ref(&file)),
        ),
        Command::Info { file } => {
            let source = read_source(&file).await?;
            let info = inspect(&source.bytes).with_context(|| file.display().to_string())?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(());
        }
        other => bail!("not a transform command: {:?}", other),
    };

    debug!(operation = pdf_command.name(), "running");
    let outputs = pdf_command.run()?;
    let names = pdf_command.output_names(outputs.len());

    for (path, bytes) in output.paths(&names).into_iter().zip(&outputs) {
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), size = bytes.len(), "wrote output");
        println!("{}", path.display());
    }
    Ok(())
}

/// Where outputs land: an explicit file, or a directory combined with the
/// command's default names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Dir(PathBuf),
}

impl OutputTarget {
    pub fn paths(&self, names: &[String]) -> Vec<PathBuf> {
        match self {
            OutputTarget::File(path) => vec![path.clone()],
            OutputTarget::Dir(dir) => names.iter().map(|name| dir.join(name)).collect(),
        }
    }
}

fn output_target(output: Option<PathBuf>, inputs: &[PathBuf]) -> OutputTarget {
    match (output, inputs.first()) {
        (Some(path), _) => OutputTarget::File(path),
        (None, Some(first)) => beside(first),
        (None, None) => OutputTarget::Dir(PathBuf::from(".")),
    }
}

fn beside(input: &Path) -> OutputTarget {
    let dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    OutputTarget::Dir(dir)
}

pub async fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, bytes))
}

/// Read inputs one at a time, keeping argument order
async fn read_all(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_source(path).await?);
    }
    Ok(files)
}
