//! `c4b pdf` command implementation.

use c4b_build::{MdToPdf, PdfAssembler, run};
use c4b_config::CliSettings;
use c4b_diagrams::MermaidCli;
use clap::Args;

use super::BuildArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the pdf command.
#[derive(Args)]
pub(crate) struct PdfArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Embed linked Mermaid files as code blocks instead of rendering SVGs.
    #[arg(long)]
    embed_mermaid: bool,
}

impl PdfArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.build.load_config(CliSettings {
            embed_mermaid_diagrams: self.embed_mermaid.then_some(true),
            ..CliSettings::default()
        })?;
        output.announce("pdf", &config);

        let renderer = MermaidCli::new(&config.diagrams.mermaid_cli);
        let converter = MdToPdf::new(&config.pdf_resolved.converter);
        let mut assembler = PdfAssembler::new(&renderer, &converter);
        let report = run(&mut assembler, &config, self.build.clean)?;

        output.report(&report);
        for path in &report.outputs {
            output.done(format!("PDF written to {}", path.display()));
        }
        Ok(())
    }
}
