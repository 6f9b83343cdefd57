//! Recursive directory scanning.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use crate::tree::{SourceFile, SourceTree, TreeNode};

/// Builds a [`SourceTree`] by depth-first descent from a base folder.
///
/// Entries whose names start with `_` or `.` are never visited. I/O problems
/// on individual entries are logged and the entry is treated as absent, so a
/// scan always produces a tree (possibly empty).
pub struct SourceTreeBuilder {
    base_folder: PathBuf,
    homepage_name: Option<String>,
    mirror_folder: Option<PathBuf>,
    nodes: Vec<TreeNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
}

impl SourceTreeBuilder {
    /// Create a builder scanning `base_folder`.
    #[must_use]
    pub fn new(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
            homepage_name: None,
            mirror_folder: None,
            nodes: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Display name of the root node. Defaults to the base folder's name.
    #[must_use]
    pub fn homepage_name(mut self, name: impl Into<String>) -> Self {
        self.homepage_name = Some(name.into());
        self
    }

    /// Create a mirror of every visited directory under `folder`.
    ///
    /// The mirror folder itself is skipped when it lies inside the base folder.
    #[must_use]
    pub fn mirror_into(mut self, folder: impl Into<PathBuf>) -> Self {
        self.mirror_folder = Some(folder.into());
        self
    }

    /// Scan the base folder.
    #[must_use]
    pub fn build(mut self) -> SourceTree {
        let base = self.base_folder.clone();
        let root = self.scan_directory(&base, 0, None);
        tracing::debug!(
            base = %base.display(),
            nodes = self.nodes.len(),
            "Scanned source tree"
        );
        SourceTree::new(self.nodes, self.children, self.parents, root)
    }

    /// Scan one directory, returning its arena index when it is kept.
    fn scan_directory(&mut self, dir: &Path, level: usize, parent: Option<&Path>) -> Option<usize> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory");
                return None;
            }
        };

        let mut names: Vec<OsString> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.file_name()),
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                    None
                }
            })
            .filter(|name| !is_excluded(name))
            .collect();
        names.sort();

        let mut descendants = Vec::new();
        let mut kept_children = Vec::new();
        let mut md_files = Vec::new();
        let mut mmd_files = Vec::new();

        for name in names {
            let path = dir.join(&name);
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat entry");
                    continue;
                }
            };

            if metadata.is_dir() {
                if self.is_mirror(&path) {
                    tracing::debug!(path = %path.display(), "Skipping output folder");
                    continue;
                }
                descendants.push(name.to_string_lossy().into_owned());
                self.ensure_mirror(&path);
                if let Some(child) = self.scan_directory(&path, level + 1, Some(dir)) {
                    kept_children.push(child);
                }
            } else if has_extension(&path, "md") {
                md_files.extend(read_source(&path));
            } else if has_extension(&path, "mmd") {
                mmd_files.extend(read_source(&path));
            }
        }

        if md_files.is_empty() && mmd_files.is_empty() && descendants.is_empty() {
            tracing::debug!(path = %dir.display(), "Pruning directory without content");
            return None;
        }

        let name = match (level, &self.homepage_name) {
            (0, Some(homepage)) => homepage.clone(),
            _ => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            dir: dir.to_path_buf(),
            rel_dir: dir
                .strip_prefix(&self.base_folder)
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            name,
            level,
            parent: parent.map(Path::to_path_buf),
            md_files,
            mmd_files,
            descendants,
        });
        self.parents.push(None);
        for &child in &kept_children {
            self.parents[child] = Some(idx);
        }
        self.children.push(kept_children);

        Some(idx)
    }

    fn is_mirror(&self, path: &Path) -> bool {
        self.mirror_folder.as_deref().is_some_and(|mirror| {
            match (fs::canonicalize(mirror), fs::canonicalize(path)) {
                (Ok(mirror), Ok(path)) => mirror == path,
                _ => false,
            }
        })
    }

    fn ensure_mirror(&self, dir: &Path) {
        let Some(mirror) = &self.mirror_folder else {
            return;
        };
        let Ok(rel) = dir.strip_prefix(&self.base_folder) else {
            return;
        };
        let target = mirror.join(rel);
        if let Err(e) = fs::create_dir_all(&target) {
            tracing::warn!(path = %target.display(), error = %e, "Failed to create output directory");
        }
    }
}

/// Names starting with `_` or `.` are private to the source tree.
fn is_excluded(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('_') || name.starts_with('.')
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Read a source file. Unreadable and empty files yield nothing.
fn read_source(path: &Path) -> Option<SourceFile> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read source file");
            return None;
        }
    };
    if content.is_empty() {
        tracing::debug!(path = %path.display(), "Skipping empty source file");
        return None;
    }
    Some(SourceFile {
        name: path.file_name()?.to_string_lossy().into_owned(),
        content,
    })
}
