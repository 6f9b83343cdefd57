//! CLI command implementations.

mod md;
mod pdf;
mod site;

use std::path::PathBuf;

use c4b_config::{CliSettings, Config};
use clap::Args;

use crate::error::CliError;

pub(crate) use md::MdArgs;
pub(crate) use pdf::PdfArgs;
pub(crate) use site::SiteArgs;

/// Arguments shared by every build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover c4b.toml).
    #[arg(short, long, env = "C4B_CONFIG")]
    config: Option<PathBuf>,

    /// Markdown/Mermaid source folder (overrides config).
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Output folder (overrides config).
    #[arg(short, long)]
    dist_folder: Option<PathBuf>,

    /// Empty the output folder before building.
    #[arg(long)]
    clean: bool,

    /// Enable verbose output (show per-step logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Load the configuration with these arguments (and `settings`) applied.
    fn load_config(&self, settings: CliSettings) -> Result<Config, CliError> {
        let settings = CliSettings {
            root_folder: self.root_folder.clone(),
            dist_folder: self.dist_folder.clone(),
            ..settings
        };
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        tracing::debug!(
            config = ?config.config_path,
            root = %config.paths_resolved.root_folder.display(),
            dist = %config.paths_resolved.dist_folder.display(),
            "Loaded configuration"
        );
        Ok(config)
    }
}
