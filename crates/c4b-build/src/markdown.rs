//! Markdown output: one bundled document, or one document per directory.

use std::fs;
use std::path::Path;

use c4b_config::Config;
use c4b_diagrams::DiagramRenderer;
use c4b_markdown::{MarkdownTransformer, OutputTarget, TransformConfig, relative_url};
use c4b_tree::{SourceTree, TreeNode};

use crate::document::{concatenated_document, node_content, slash_path};
use crate::{BuildError, BuildReport, OutputAssembler, write_if_changed};

const README: &str = "README.md";

/// Writes `<dist>/README.md`, or `<dist>/<dir>/README.md` for every directory
/// when `markdown.single_file` is off.
pub struct MarkdownAssembler<'r> {
    renderer: &'r dyn DiagramRenderer,
}

impl<'r> MarkdownAssembler<'r> {
    #[must_use]
    pub fn new(renderer: &'r dyn DiagramRenderer) -> Self {
        Self { renderer }
    }

    fn transform_config(config: &Config, target: OutputTarget) -> TransformConfig {
        TransformConfig {
            root_folder: config.paths_resolved.root_folder.clone(),
            dist_folder: config.paths_resolved.dist_folder.clone(),
            embed_mermaid_diagrams: config.markdown.embed_mermaid_diagrams,
            target,
        }
    }

    fn single_file(&self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError> {
        let transformer = MarkdownTransformer::new(self.renderer);
        let transform_config = Self::transform_config(config, OutputTarget::Bundle);
        let mut report = BuildReport::default();

        let document = concatenated_document(
            tree,
            config,
            &transformer,
            &transform_config,
            &mut report.warnings,
        );
        let path = config.paths_resolved.dist_folder.join(README);
        write_if_changed(&path, &document)?;
        tracing::info!(path = %path.display(), "Wrote Markdown document");

        report.outputs.push(path);
        Ok(report)
    }

    fn per_directory(&self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError> {
        let transformer = MarkdownTransformer::new(self.renderer);
        let transform_config = Self::transform_config(config, OutputTarget::PerDirectory);
        let dist = &config.paths_resolved.dist_folder;
        let nodes = tree.root_first();
        let mut report = BuildReport::default();

        for node in &nodes {
            let out_dir = dist.join(&node.rel_dir);
            fs::create_dir_all(&out_dir)?;

            let mut page = format!("# {}", node.name);
            if !node.is_root() {
                page.push_str(&format!("\n\n`/{}`", slash_path(&node.rel_dir)));
            }
            page.push_str("\n\n");
            page.push_str(&table_of_contents(&nodes, node, &out_dir, dist));
            page.push_str("\n\n---");

            let content = node_content(node, &transformer, &transform_config, &mut report.warnings);
            if !content.is_empty() {
                page.push_str("\n\n");
                page.push_str(&content);
            }
            page.push('\n');

            let path = out_dir.join(README);
            write_if_changed(&path, &page)?;
            tracing::debug!(path = %path.display(), "Wrote Markdown page");
            report.outputs.push(path);
        }

        tracing::info!(pages = report.outputs.len(), "Wrote Markdown pages");
        Ok(report)
    }
}

impl OutputAssembler for MarkdownAssembler<'_> {
    fn kind(&self) -> &'static str {
        "md"
    }

    fn assemble(&mut self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError> {
        if config.markdown.single_file {
            self.single_file(tree, config)
        } else {
            self.per_directory(tree, config)
        }
    }
}

/// Links to every page, the current one in bold.
fn table_of_contents(nodes: &[&TreeNode], current: &TreeNode, out_dir: &Path, dist: &Path) -> String {
    nodes
        .iter()
        .map(|node| {
            let label = if node.dir == current.dir {
                format!("**{}**", node.name)
            } else {
                node.name.clone()
            };
            let target = dist.join(&node.rel_dir).join(README);
            format!(
                "{}* [{label}]({})",
                "    ".repeat(node.level),
                relative_url(out_dir, &target)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run;
    use crate::test_support::{FakeRenderer, project};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_file_document() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();

        let report = run(&mut MarkdownAssembler::new(&renderer), &config, false).unwrap();

        let readme = tmp.path().join("docs/README.md");
        assert_eq!(report.outputs, vec![readme.clone()]);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let content = fs::read_to_string(readme).unwrap();
        assert!(content.starts_with(
            "# Demo Project\n\n\
             * [Overview](#Overview)\n\
             \x20   * [backend](#backend)\n\
             \x20       * [api](#api)\n\n\
             ---\n\n\
             # Overview\n\nWelcome."
        ));
        assert!(content.contains("![context.svg](backend/api/context.svg)"));
        assert!(content.ends_with('\n'));
        assert!(tmp.path().join("docs/backend/api/context.svg").exists());
    }

    #[test]
    fn test_single_file_embeds_diagrams_when_configured() {
        let (tmp, mut config) = project();
        config.markdown.embed_mermaid_diagrams = true;
        let renderer = FakeRenderer::default();

        run(&mut MarkdownAssembler::new(&renderer), &config, false).unwrap();

        let content = fs::read_to_string(tmp.path().join("docs/README.md")).unwrap();
        assert!(content.contains("mermaid\ngraph TD; A-->B\n"));
        assert!(renderer.calls.borrow().is_empty());
    }

    #[test]
    fn test_per_directory_pages() {
        let (tmp, mut config) = project();
        config.markdown.single_file = false;
        let renderer = FakeRenderer::default();

        let report = run(&mut MarkdownAssembler::new(&renderer), &config, false).unwrap();

        let docs = tmp.path().join("docs");
        assert_eq!(
            report.outputs,
            vec![
                docs.join("README.md"),
                docs.join("backend/README.md"),
                docs.join("backend/api/README.md"),
            ]
        );

        let api = fs::read_to_string(docs.join("backend/api/README.md")).unwrap();
        assert!(api.starts_with(
            "# api\n\n\
             `/backend/api`\n\n\
             * [Overview](../../README.md)\n\
             \x20   * [backend](../README.md)\n\
             \x20       * [**api**](README.md)\n\n\
             ---\n\n\
             The API."
        ));
        assert!(api.contains("![context.svg](context.svg)"));

        let root = fs::read_to_string(docs.join("README.md")).unwrap();
        assert!(root.starts_with("# Overview\n\n* [**Overview**](README.md)\n"));
        assert!(!root.contains('`'));
    }
}
