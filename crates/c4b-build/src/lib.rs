//! Output assembly for c4b.
//!
//! Every output format follows the same template: [`prepare_output_folder`]
//! validates and optionally empties the destination, the source tree is
//! scanned (mirroring its directories into the destination), and an
//! [`OutputAssembler`] strategy writes the final artifacts:
//!
//! - [`MarkdownAssembler`]: one concatenated `README.md`, or one per directory
//! - [`SiteAssembler`]: a docsify site, skipping unchanged directories
//! - [`PdfAssembler`]: the concatenated document converted to PDF
//!
//! # Example
//!
//! ```no_run
//! use c4b_build::{MarkdownAssembler, run};
//! use c4b_config::Config;
//! use c4b_diagrams::MermaidCli;
//!
//! let config = Config::load(None, None)?;
//! let renderer = MermaidCli::new(&config.diagrams.mermaid_cli);
//! let mut assembler = MarkdownAssembler::new(&renderer);
//!
//! let report = run(&mut assembler, &config, false)?;
//! println!("wrote {} file(s)", report.outputs.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod document;
mod markdown;
mod pdf;
mod prepare;
mod site;
mod template;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use c4b_config::Config;
use c4b_tree::{SourceTree, SourceTreeBuilder};

pub use document::{document_body, document_header};
pub use markdown::MarkdownAssembler;
pub use pdf::{MdToPdf, PdfAssembler, PdfConverter, PdfError};
pub use prepare::{empty_sub_folder, prepare_output_folder};
pub use site::SiteAssembler;
pub use template::{
    DOCSIFY_TEMPLATE, DocsifyOptions, DocsifyTemplate, FileTemplate, SiteTemplate, TemplateError,
    TemplateRegistry,
};

/// Error returned by an output build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{0}")]
    Preparation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF conversion failed: {0}")]
    Pdf(#[from] PdfError),

    #[error("{0}")]
    Template(#[from] TemplateError),
}

/// Summary of a finished build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Files written (or confirmed up to date) by the strategy.
    pub outputs: Vec<PathBuf>,
    /// Directories skipped because none of their sources changed.
    pub skipped: usize,
    /// Problems that degraded, but did not stop, the build.
    pub warnings: Vec<String>,
}

/// An output format.
pub trait OutputAssembler {
    /// Command name of the format (`md`, `site`, `pdf`).
    fn kind(&self) -> &'static str;

    /// Write the artifacts for `tree` into the configured destination.
    fn assemble(&mut self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError>;
}

/// Run an output build: prepare the destination, scan the sources, assemble.
pub fn run(
    assembler: &mut dyn OutputAssembler,
    config: &Config,
    clean: bool,
) -> Result<BuildReport, BuildError> {
    let kind = assembler.kind();
    if !prepare_output_folder(kind, config, clean) {
        return Err(BuildError::Preparation(format!(
            "cannot prepare output folder for `{kind}`"
        )));
    }

    let paths = &config.paths_resolved;
    tracing::info!(root = %paths.root_folder.display(), "Scanning source tree");
    let tree = SourceTreeBuilder::new(&paths.root_folder)
        .homepage_name(&config.project.homepage_name)
        .mirror_into(&paths.dist_folder)
        .build();
    if tree.is_empty() {
        return Err(BuildError::Preparation(format!(
            "no Markdown or Mermaid files found in {}",
            paths.root_folder.display()
        )));
    }
    tracing::info!(folders = tree.len(), "Parsed source tree");

    tracing::info!(
        kind,
        dist = %paths.dist_folder.display(),
        "Building documentation"
    );
    assembler.assemble(&tree, config)
}

/// Write `contents` to `path` unless the file already holds exactly these bytes.
///
/// Returns whether the file was written.
pub(crate) fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
    if fs::read(path).is_ok_and(|existing| existing == contents.as_bytes()) {
        return Ok(false);
    }
    fs::write(path, contents)?;
    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};

    use c4b_config::Config;
    use c4b_diagrams::DiagramRenderer;

    /// Renderer writing a fixed SVG and recording every call.
    #[derive(Default)]
    pub(crate) struct FakeRenderer {
        pub(crate) calls: RefCell<Vec<PathBuf>>,
    }

    impl DiagramRenderer for FakeRenderer {
        fn render(&self, _diagram_text: &str, output_path: &Path) -> bool {
            self.calls.borrow_mut().push(output_path.to_path_buf());
            fs::create_dir_all(output_path.parent().unwrap()).unwrap();
            fs::write(output_path, "<svg/>").unwrap();
            true
        }
    }

    /// Project with `src/` (root README plus `backend/api`) and `docs/` as destination.
    pub(crate) fn project() -> (tempfile::TempDir, Config) {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("backend/api")).unwrap();
        fs::write(src.join("README.md"), "Welcome.\n").unwrap();
        fs::write(src.join("backend/README.md"), "Backend services.\n").unwrap();
        fs::write(
            src.join("backend/api/README.md"),
            "The API.\n\n[Context](context.mmd)\n",
        )
        .unwrap();
        fs::write(src.join("backend/api/context.mmd"), "graph TD; A-->B").unwrap();

        let mut config = Config::with_base(tmp.path());
        config.project.name = "Demo Project".to_owned();
        (tmp, config)
    }
}
