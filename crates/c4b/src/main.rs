//! c4b CLI - Markdown and Mermaid documentation builder.
//!
//! Provides commands for:
//! - `md`: Build a Markdown bundle
//! - `pdf`: Build a PDF document
//! - `site`: Build a docsify site

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{MdArgs, PdfArgs, SiteArgs};
use error::CliError;
use output::Output;

/// c4b - Markdown and Mermaid documentation builder.
#[derive(Parser)]
#[command(name = "c4b", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a Markdown bundle.
    Md(MdArgs),
    /// Build a PDF document.
    Pdf(PdfArgs),
    /// Build a docsify site.
    Site(SiteArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Md(args) => args.build.verbose,
            Self::Pdf(args) => args.build.verbose,
            Self::Site(args) => args.build.verbose,
        }
    }

    fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Md(args) => args.execute(),
            Self::Pdf(args) => args.execute(),
            Self::Site(args) => args.execute(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.command.execute() {
        output.failed(&err);
        std::process::exit(1);
    }
}
