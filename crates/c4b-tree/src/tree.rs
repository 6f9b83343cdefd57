//! Arena representation of a scanned source tree.

use std::path::{Path, PathBuf};

/// A source file read during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name including extension (e.g., `"README.md"`).
    pub name: String,
    /// Full file content.
    pub content: String,
}

impl SourceFile {
    /// Absolute location of the file given its directory.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.name)
    }
}

/// One source directory that has content to publish.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Path of the directory.
    pub dir: PathBuf,
    /// Directory path relative to the scan root (empty at the root).
    pub rel_dir: PathBuf,
    /// Display name: the homepage name at the root, else the directory name.
    pub name: String,
    /// Depth from the scan root (0 at the root).
    pub level: usize,
    /// Path of the owning directory, `None` at the root.
    pub parent: Option<PathBuf>,
    /// Markdown files directly in `dir`, in name order.
    pub md_files: Vec<SourceFile>,
    /// Mermaid files directly in `dir`, in name order.
    pub mmd_files: Vec<SourceFile>,
    /// Names of the immediate subdirectories that were recursed into.
    pub descendants: Vec<String>,
}

impl TreeNode {
    /// Whether this node is the scan root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Paths of every source file owned by this node.
    pub fn source_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.md_files
            .iter()
            .chain(&self.mmd_files)
            .map(|file| file.path_in(&self.dir))
    }
}

/// Scanned source tree.
///
/// Nodes live in a flat arena; `children` and `parents` hold arena indices.
/// Use [`root_first`](Self::root_first) or [`leaf_first`](Self::leaf_first)
/// rather than relying on arena order.
#[derive(Debug, Default)]
pub struct SourceTree {
    nodes: Vec<TreeNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    root: Option<usize>,
}

impl SourceTree {
    pub(crate) fn new(
        nodes: Vec<TreeNode>,
        children: Vec<Vec<usize>>,
        parents: Vec<Option<usize>>,
        root: Option<usize>,
    ) -> Self {
        Self {
            nodes,
            children,
            parents,
            root,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scan found nothing to publish.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node, if the tree is not empty.
    #[must_use]
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.map(|idx| &self.nodes[idx])
    }

    /// Find the node for a directory.
    #[must_use]
    pub fn get(&self, dir: &Path) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| node.dir == dir)
    }

    /// Kept child nodes of `node`, in name order.
    #[must_use]
    pub fn children_of(&self, node: &TreeNode) -> Vec<&TreeNode> {
        self.index_of(node)
            .map(|idx| self.children[idx].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Node owning `node`, `None` at the root.
    #[must_use]
    pub fn parent_of(&self, node: &TreeNode) -> Option<&TreeNode> {
        let idx = self.index_of(node)?;
        self.parents[idx].map(|p| &self.nodes[p])
    }

    /// Pre-order traversal: each node before its children, siblings in name order.
    #[must_use]
    pub fn root_first(&self) -> Vec<&TreeNode> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.pre_order(root, &mut order);
        }
        order.into_iter().map(|idx| &self.nodes[idx]).collect()
    }

    /// Post-order traversal: children before their parent, siblings in name order.
    #[must_use]
    pub fn leaf_first(&self) -> Vec<&TreeNode> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.post_order(root, &mut order);
        }
        order.into_iter().map(|idx| &self.nodes[idx]).collect()
    }

    fn pre_order(&self, idx: usize, order: &mut Vec<usize>) {
        order.push(idx);
        for &child in &self.children[idx] {
            self.pre_order(child, order);
        }
    }

    fn post_order(&self, idx: usize, order: &mut Vec<usize>) {
        for &child in &self.children[idx] {
            self.post_order(child, order);
        }
        order.push(idx);
    }

    fn index_of(&self, node: &TreeNode) -> Option<usize> {
        self.nodes.iter().position(|n| n.dir == node.dir)
    }
}
