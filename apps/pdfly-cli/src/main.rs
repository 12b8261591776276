//! pdfly command-line tool
//!
//! Runs the PDF transforms on local files and manages the signed-in session
//! against the pdfly auth service.

use clap::{Parser, Subcommand};
use pdfly_core::CompressionLevel;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod account;
mod transform;

#[derive(Parser, Debug)]
#[command(name = "pdfly", version)]
#[command(about = "Merge, split, trim, convert and compress PDFs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine PDFs in the order given
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write every page to its own PDF
    Split {
        file: PathBuf,
        /// Directory for the page files (defaults to the input's directory)
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },
    /// Drop pages, e.g. --pages "1-3, 7"
    Remove {
        file: PathBuf,
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep only the listed pages, in the order listed, e.g. --pages "3,1,2"
    Extract {
        file: PathBuf,
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Package JPEG/PNG images into a PDF, one page per image
    Images {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrite a PDF losslessly (low, medium, high)
    Compress {
        file: PathBuf,
        #[arg(short, long, default_value = "medium")]
        level: CompressionLevel,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print page count and metadata as JSON
    Info { file: PathBuf },
    /// Create an account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PDFLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and store the credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PDFLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored credential
    Logout,
    /// Verify the stored credential and show who is signed in
    Status,
}

impl Command {
    fn is_account(&self) -> bool {
        matches!(
            self,
            Command::Signup { .. } | Command::Login { .. } | Command::Logout | Command::Status
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.command.is_account() {
        account::run(cli.command).await
    } else {
        transform::run(cli.command).await
    }
}
