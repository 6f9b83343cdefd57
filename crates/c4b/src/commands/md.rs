//! `c4b md` command implementation.

use c4b_build::{MarkdownAssembler, run};
use c4b_config::CliSettings;
use c4b_diagrams::MermaidCli;
use clap::Args;

use super::BuildArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the md command.
#[derive(Args)]
pub(crate) struct MdArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Embed linked Mermaid files as code blocks instead of rendering SVGs.
    #[arg(long)]
    embed_mermaid: bool,
}

impl MdArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.build.load_config(CliSettings {
            embed_mermaid_diagrams: self.embed_mermaid.then_some(true),
            ..CliSettings::default()
        })?;
        output.announce("md", &config);

        let renderer = MermaidCli::new(&config.diagrams.mermaid_cli);
        let mut assembler = MarkdownAssembler::new(&renderer);
        let report = run(&mut assembler, &config, self.build.clean)?;

        output.report(&report);
        output.done(format!(
            "Markdown written to {} ({} file(s))",
            config.paths_resolved.dist_folder.display(),
            report.outputs.len()
        ));
        Ok(())
    }
}
