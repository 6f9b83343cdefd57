//! `c4b site` command implementation.

use c4b_build::{SiteAssembler, run};
use c4b_config::CliSettings;
use c4b_diagrams::MermaidCli;
use clap::Args;

use super::BuildArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the site command.
#[derive(Args)]
pub(crate) struct SiteArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Rebuild every page, ignoring recorded content hashes.
    #[arg(long)]
    no_cache: bool,
}

impl SiteArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.build.load_config(CliSettings {
            cache_enabled: self.no_cache.then_some(false),
            ..CliSettings::default()
        })?;
        output.announce("site", &config);

        let renderer = MermaidCli::new(&config.diagrams.mermaid_cli);
        let mut assembler = SiteAssembler::new(&renderer).clean(self.build.clean);
        let report = run(&mut assembler, &config, self.build.clean)?;

        output.report(&report);
        output.done(format!(
            "Site written to {}",
            config.paths_resolved.dist_folder.display()
        ));
        Ok(())
    }
}
