//! Mermaid CLI invocation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::DiagramRenderer;

/// Why a render attempt failed. Never leaves this crate.
#[derive(Debug, thiserror::Error)]
enum RenderError {
    #[error("no renderer command configured")]
    EmptyCommand,
    #[error("`{program}` not found: {source}")]
    NotFound {
        program: String,
        source: which::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("renderer produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// [`DiagramRenderer`] backed by the Mermaid CLI.
///
/// The command is a program followed by optional leading arguments, e.g.
/// `mmdc` or `node node_modules/.bin/mmdc`. It is invoked as
/// `<command> -i <input.mmd> -o <output>`.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: String,
    args: Vec<String>,
}

impl MermaidCli {
    /// Create a renderer for a whitespace-separated command line.
    #[must_use]
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_owned);
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
        }
    }

    fn try_render(&self, diagram_text: &str, output_path: &Path) -> Result<(), RenderError> {
        if self.program.is_empty() {
            return Err(RenderError::EmptyCommand);
        }
        let program = which::which(&self.program).map_err(|source| RenderError::NotFound {
            program: self.program.clone(),
            source,
        })?;

        let output_dir = output_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(output_dir)?;

        // Output existence is the success signal, so a stale file must not count.
        if output_path.exists() {
            fs::remove_file(output_path)?;
        }

        let mut input = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(".mmd")
            .tempfile_in(output_dir)?;
        input.write_all(diagram_text.as_bytes())?;
        input.flush()?;

        tracing::debug!(
            program = %program.display(),
            input = %input.path().display(),
            output = %output_path.display(),
            "Running Mermaid CLI"
        );
        let result = Command::new(&program)
            .args(&self.args)
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output_path)
            .output();

        let input_path = input.path().to_path_buf();
        if let Err(e) = input.close() {
            tracing::warn!(path = %input_path.display(), error = %e, "Failed to remove temporary diagram file");
        }

        let output = result?;
        if !output.status.success() {
            tracing::warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Mermaid CLI exited with failure"
            );
        }

        if !output_path.exists() {
            return Err(RenderError::MissingOutput(output_path.to_path_buf()));
        }
        Ok(())
    }
}

impl DiagramRenderer for MermaidCli {
    fn render(&self, diagram_text: &str, output_path: &Path) -> bool {
        match self.try_render(diagram_text, output_path) {
            Ok(()) => {
                tracing::debug!(path = %output_path.display(), "Rendered diagram");
                true
            }
            Err(e) => {
                tracing::error!(path = %output_path.display(), error = %e, "Failed to render diagram");
                false
            }
        }
    }
}
