//! Mermaid diagram rendering for c4b.
//!
//! Rendering is delegated to an external executable (the Mermaid CLI by
//! default). The [`DiagramRenderer`] trait is the seam the Markdown pipeline
//! depends on; [`MermaidCli`] is the production implementation and tests
//! substitute their own.
//!
//! Renderers never fail loudly: every problem is logged and reported as
//! `false`, and the caller leaves the diagram reference untouched.

mod mermaid;

pub use mermaid::MermaidCli;

use std::path::Path;

/// Renders diagram source text to an image file.
pub trait DiagramRenderer {
    /// Render `diagram_text` to `output_path`.
    ///
    /// Returns `true` only when the output file exists afterwards.
    fn render(&self, diagram_text: &str, output_path: &Path) -> bool;

    /// Name of an image file that does not exist yet in `directory`.
    fn unique_filename(&self, directory: &Path) -> String {
        unique_filename(directory)
    }
}

/// Probe `mmd_1.svg`, `mmd_2.svg`, ... until a name is free in `directory`.
#[must_use]
pub fn unique_filename(directory: &Path) -> String {
    (1..)
        .map(|n: u64| format!("mmd_{n}.svg"))
        .find(|name| !directory.join(name).exists())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unique_filename_starts_at_one() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(unique_filename(tmp.path()), "mmd_1.svg");
    }

    #[test]
    fn test_unique_filename_skips_taken_names() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("mmd_1.svg"), "<svg/>").unwrap();
        std::fs::write(tmp.path().join("mmd_2.svg"), "<svg/>").unwrap();

        assert_eq!(unique_filename(tmp.path()), "mmd_3.svg");
    }

    #[test]
    fn test_unique_filename_in_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(unique_filename(&tmp.path().join("not-yet")), "mmd_1.svg");
    }
}
