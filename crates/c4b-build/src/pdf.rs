//! PDF output.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use c4b_config::Config;
use c4b_diagrams::DiagramRenderer;
use c4b_markdown::{MarkdownTransformer, OutputTarget, TransformConfig};
use c4b_tree::SourceTree;

use crate::document::concatenated_document;
use crate::{BuildError, BuildReport, OutputAssembler};

/// Error returned by a Markdown-to-PDF conversion.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("`{program}` not found: {source}")]
    NotFound {
        program: String,
        source: which::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Converts a Markdown file to PDF.
pub trait PdfConverter {
    /// Convert `source`, returning the path of the generated PDF.
    fn convert(&self, source: &Path, stylesheet: Option<&Path>) -> Result<PathBuf, PdfError>;
}

/// [`PdfConverter`] backed by the `md-to-pdf` CLI.
///
/// Invoked as `<command> <source.md> [--stylesheet <css>]`; the PDF is
/// written next to the source with a `.pdf` extension.
#[derive(Debug, Clone)]
pub struct MdToPdf {
    program: String,
    args: Vec<String>,
}

impl MdToPdf {
    /// Create a converter for a whitespace-separated command line.
    #[must_use]
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_owned);
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
        }
    }
}

impl PdfConverter for MdToPdf {
    fn convert(&self, source: &Path, stylesheet: Option<&Path>) -> Result<PathBuf, PdfError> {
        if self.program.is_empty() {
            return Err(PdfError::Failed("no PDF converter configured".to_owned()));
        }
        let program = which::which(&self.program).map_err(|source| PdfError::NotFound {
            program: self.program.clone(),
            source,
        })?;

        let output_path = source.with_extension("pdf");
        if output_path.exists() {
            fs::remove_file(&output_path)?;
        }

        let mut command = Command::new(&program);
        command.args(&self.args).arg(source);
        if let Some(css) = stylesheet {
            command.arg("--stylesheet").arg(css);
        }
        tracing::debug!(program = %program.display(), source = %source.display(), "Running PDF converter");
        let output = command.output()?;

        if !output.status.success() {
            return Err(PdfError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !output_path.exists() {
            return Err(PdfError::Failed(format!(
                "{} produced no output at {}",
                self.program,
                output_path.display()
            )));
        }
        Ok(output_path)
    }
}

/// Converts the concatenated document to `<dist>/<project name>.pdf`.
pub struct PdfAssembler<'a> {
    renderer: &'a dyn DiagramRenderer,
    converter: &'a dyn PdfConverter,
}

impl<'a> PdfAssembler<'a> {
    #[must_use]
    pub fn new(renderer: &'a dyn DiagramRenderer, converter: &'a dyn PdfConverter) -> Self {
        Self {
            renderer,
            converter,
        }
    }
}

impl OutputAssembler for PdfAssembler<'_> {
    fn kind(&self) -> &'static str {
        "pdf"
    }

    fn assemble(&mut self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError> {
        let paths = &config.paths_resolved;
        let transform_config = TransformConfig {
            root_folder: paths.root_folder.clone(),
            dist_folder: paths.dist_folder.clone(),
            embed_mermaid_diagrams: config.markdown.embed_mermaid_diagrams,
            target: OutputTarget::Bundle,
        };
        let transformer = MarkdownTransformer::new(self.renderer);
        let mut report = BuildReport::default();
        let document = concatenated_document(
            tree,
            config,
            &transformer,
            &transform_config,
            &mut report.warnings,
        );

        let mut source = tempfile::Builder::new()
            .prefix("c4b-")
            .suffix(".md")
            .tempfile_in(&paths.dist_folder)?;
        source.write_all(document.as_bytes())?;
        source.flush()?;

        let stylesheet = config.pdf_resolved.css.as_deref().filter(|css| {
            let exists = css.is_file();
            if !exists {
                tracing::warn!(path = %css.display(), "PDF stylesheet not found; converting without it");
            }
            exists
        });

        let converted = self.converter.convert(source.path(), stylesheet);

        let source_path = source.path().to_path_buf();
        if let Err(e) = source.close() {
            tracing::warn!(path = %source_path.display(), error = %e, "Failed to remove temporary document");
        }

        let generated = converted.inspect_err(|e| {
            tracing::error!(error = %e, "PDF conversion failed");
        })?;
        let target = paths.dist_folder.join(pdf_file_name(&config.project.name));
        fs::rename(&generated, &target)?;
        tracing::info!(path = %target.display(), "Wrote PDF");

        report.outputs.push(target);
        Ok(report)
    }
}

fn pdf_file_name(project_name: &str) -> String {
    format!("{}.pdf", project_name.replace(['/', '\\'], "-"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::run;
    use crate::test_support::{FakeRenderer, project};
    use pretty_assertions::assert_eq;

    /// Writes the source Markdown into the PDF so tests can inspect it.
    #[derive(Default)]
    struct FakeConverter {
        calls: RefCell<Vec<(PathBuf, Option<PathBuf>)>>,
        fail: bool,
    }

    impl PdfConverter for FakeConverter {
        fn convert(&self, source: &Path, stylesheet: Option<&Path>) -> Result<PathBuf, PdfError> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), stylesheet.map(Path::to_path_buf)));
            if self.fail {
                return Err(PdfError::Failed("converter crashed".to_owned()));
            }
            let output = source.with_extension("pdf");
            fs::copy(source, &output)?;
            Ok(output)
        }
    }

    fn dist_entries(dist: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dist)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_pdf_written_under_project_name_and_temp_removed() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        let converter = FakeConverter::default();

        let report = run(&mut PdfAssembler::new(&renderer, &converter), &config, false).unwrap();

        let dist = tmp.path().join("docs");
        let pdf = dist.join("Demo Project.pdf");
        assert_eq!(report.outputs, vec![pdf.clone()]);
        assert_eq!(dist_entries(&dist), vec!["Demo Project.pdf".to_owned()]);

        let content = fs::read_to_string(pdf).unwrap();
        assert!(content.starts_with("# Demo Project\n\n* [Overview](#Overview)"));
        assert!(content.contains("# api\n\n[Overview](#Demo-Project)"));
        assert!(content.contains("![context.svg](backend/api/context.svg)"));

        let (source, stylesheet) = converter.calls.borrow()[0].clone();
        assert_eq!(source.parent().unwrap(), dist);
        assert_eq!(stylesheet, None);
    }

    #[test]
    fn test_pdf_passes_existing_stylesheet() {
        let (tmp, mut config) = project();
        let css = tmp.path().join("pdf.css");
        fs::write(&css, "body {}").unwrap();
        config.pdf_resolved.css = Some(css.clone());
        let renderer = FakeRenderer::default();
        let converter = FakeConverter::default();

        run(&mut PdfAssembler::new(&renderer, &converter), &config, false).unwrap();

        assert_eq!(converter.calls.borrow()[0].1, Some(css));
    }

    #[test]
    fn test_pdf_skips_missing_stylesheet() {
        let (tmp, mut config) = project();
        config.pdf_resolved.css = Some(tmp.path().join("missing.css"));
        let renderer = FakeRenderer::default();
        let converter = FakeConverter::default();

        run(&mut PdfAssembler::new(&renderer, &converter), &config, false).unwrap();

        assert_eq!(converter.calls.borrow()[0].1, None);
    }

    #[test]
    fn test_pdf_failure_is_returned_and_temp_removed() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        let converter = FakeConverter {
            fail: true,
            ..FakeConverter::default()
        };

        let result = run(&mut PdfAssembler::new(&renderer, &converter), &config, false);

        assert!(matches!(result, Err(BuildError::Pdf(PdfError::Failed(_)))));
        assert!(dist_entries(&tmp.path().join("docs")).is_empty());
    }

    #[test]
    fn test_md_to_pdf_missing_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("doc.md");
        fs::write(&source, "# Doc").unwrap();

        let result = MdToPdf::new("c4b-test-no-such-md-to-pdf").convert(&source, None);

        assert!(matches!(result, Err(PdfError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_md_to_pdf_runs_command_with_stylesheet() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fake-md-to-pdf.sh");
        // $1=source $2=--stylesheet $3=css
        fs::write(&script, "printf '%s %s' \"$2\" \"$3\" > \"${1%.md}.pdf\"\n").unwrap();
        let source = tmp.path().join("doc.md");
        fs::write(&source, "# Doc").unwrap();
        let converter = MdToPdf::new(&format!("sh {}", script.display()));

        let output = converter
            .convert(&source, Some(Path::new("style.css")))
            .unwrap();

        assert_eq!(output, tmp.path().join("doc.pdf"));
        assert_eq!(fs::read_to_string(output).unwrap(), "--stylesheet style.css");
    }

    #[cfg(unix)]
    #[test]
    fn test_md_to_pdf_nonzero_exit_is_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fake-md-to-pdf.sh");
        fs::write(&script, "echo 'chrome missing' >&2\nexit 2\n").unwrap();
        let source = tmp.path().join("doc.md");
        fs::write(&source, "# Doc").unwrap();

        let result = MdToPdf::new(&format!("sh {}", script.display())).convert(&source, None);

        assert!(matches!(result, Err(PdfError::Failed(msg)) if msg.contains("chrome missing")));
    }

    #[test]
    fn test_pdf_file_name_replaces_separators() {
        assert_eq!(pdf_file_name("a/b"), "a-b.pdf");
    }
}
