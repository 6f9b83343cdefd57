//! Building blocks shared by the concatenated-document strategies.

use std::path::Path;

use c4b_config::Config;
use c4b_markdown::{MarkdownTransformer, TransformConfig, anchor};
use c4b_tree::{SourceTree, TreeNode};

/// Title and table of contents of a concatenated document, ending with a rule.
///
/// ```text
/// # My Project
///
/// * [Overview](#Overview)
///     * [backend](#backend)
///
/// ---
/// ```
pub fn document_header(tree: &SourceTree, config: &Config) -> String {
    let toc: Vec<String> = tree
        .root_first()
        .into_iter()
        .map(|node| {
            format!(
                "{}* [{}](#{})",
                "    ".repeat(node.level),
                node.name,
                anchor(&node.name)
            )
        })
        .collect();

    format!("# {}\n\n{}\n\n---", config.project.name, toc.join("\n"))
}

/// One section per directory, root first.
///
/// Each section is the directory name as a heading, a link back to the
/// document title (except for the homepage), and the directory's transformed
/// Markdown files. Transformation warnings are appended to `warnings`.
pub fn document_body(
    tree: &SourceTree,
    config: &Config,
    transformer: &MarkdownTransformer<'_>,
    transform_config: &TransformConfig,
    warnings: &mut Vec<String>,
) -> String {
    let back_link = format!(
        "[{}](#{})",
        config.project.homepage_name,
        anchor(&config.project.name)
    );

    let sections: Vec<String> = tree
        .root_first()
        .into_iter()
        .map(|node| {
            let mut section = format!("# {}", node.name);
            if !node.is_root() {
                section.push_str("\n\n");
                section.push_str(&back_link);
            }
            let content = node_content(node, transformer, transform_config, warnings);
            if !content.is_empty() {
                section.push_str("\n\n");
                section.push_str(&content);
            }
            section
        })
        .collect();

    sections.join("\n\n")
}

/// Header and body as one document.
pub(crate) fn concatenated_document(
    tree: &SourceTree,
    config: &Config,
    transformer: &MarkdownTransformer<'_>,
    transform_config: &TransformConfig,
    warnings: &mut Vec<String>,
) -> String {
    let header = document_header(tree, config);
    let body = document_body(tree, config, transformer, transform_config, warnings);
    format!("{header}\n\n{body}\n")
}

/// Transformed Markdown files of `node`, separated by blank lines.
pub(crate) fn node_content(
    node: &TreeNode,
    transformer: &MarkdownTransformer<'_>,
    transform_config: &TransformConfig,
    warnings: &mut Vec<String>,
) -> String {
    let texts: Vec<String> = node
        .md_files
        .iter()
        .map(|file| {
            tracing::debug!(path = %file.path_in(&node.dir).display(), "Processing Markdown file");
            let result = transformer.transform(&file.content, &file.name, &node.dir, transform_config);
            warnings.extend(result.warnings);
            result.markdown.trim_end().to_owned()
        })
        .filter(|text| !text.is_empty())
        .collect();

    texts.join("\n\n")
}

/// `path` with `/` separators.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
