//! Destination folder preparation.

use std::env;
use std::fs;
use std::path::Path;

use c4b_config::Config;
use c4b_markdown::normalize;

/// Validate the destination folder, empty it when `clean` is set, and create it.
///
/// Returns `false` (after logging an error) when the build must not run:
/// no destination configured, a refused or failed clean, or a folder that
/// cannot be created.
pub fn prepare_output_folder(kind: &str, config: &Config, clean: bool) -> bool {
    let paths = &config.paths_resolved;
    if !paths.has_dist_folder() {
        tracing::error!(
            command = kind,
            "No output folder configured; set paths.dist_folder in c4b.toml before running `c4b {kind}`"
        );
        return false;
    }

    let dist = &paths.dist_folder;
    if clean && !empty_sub_folder(dist) {
        tracing::error!(path = %dist.display(), "Failed to empty the output folder");
        return false;
    }

    if let Err(e) = fs::create_dir_all(dist) {
        tracing::error!(path = %dist.display(), error = %e, "Failed to create the output folder");
        return false;
    }
    true
}

/// Delete the contents of `path`, which must be a strict subdirectory of the
/// current working directory.
///
/// Anything else (`.`, `..`, the working directory itself, unrelated
/// absolute paths) is refused with a warning and `false`, leaving the
/// filesystem untouched. A missing folder counts as already empty.
pub fn empty_sub_folder(path: &Path) -> bool {
    match env::current_dir() {
        Ok(cwd) => empty_sub_folder_in(path, &cwd),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot determine working directory; not emptying folder");
            false
        }
    }
}

pub(crate) fn empty_sub_folder_in(path: &Path, base: &Path) -> bool {
    let base = match base.canonicalize() {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!(path = %base.display(), error = %e, "Cannot resolve base directory; not emptying folder");
            return false;
        }
    };

    let target = normalize(&base.join(path));
    // Symlinks are resolved so a link inside the base cannot point outside it.
    let target = target.canonicalize().unwrap_or(target);
    if target == base || !target.starts_with(&base) {
        tracing::warn!(
            path = %path.display(),
            base = %base.display(),
            "Refusing to empty a folder that is not a subdirectory of the working directory"
        );
        return false;
    }

    if !target.exists() {
        return true;
    }

    let entries = match fs::read_dir(&target) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "Failed to read folder");
            return false;
        }
    };

    let mut emptied = true;
    for entry in entries.filter_map(Result::ok) {
        let entry_path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let result = if is_dir {
            fs::remove_dir_all(&entry_path)
        } else {
            fs::remove_file(&entry_path)
        };
        if let Err(e) = result {
            tracing::warn!(path = %entry_path.display(), error = %e, "Failed to remove");
            emptied = false;
        }
    }
    tracing::debug!(path = %target.display(), "Emptied output folder");
    emptied
}
