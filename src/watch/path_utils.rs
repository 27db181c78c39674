// src/watch/path_utils.rs

//! Path helpers for relating watcher events to project directories.

use std::path::{Component, Path, PathBuf};

/// Express `path` as a path under `root`, as spelled by `root`.
///
/// Native watchers sometimes report a different absolute prefix for the
/// same directory (symlinks, `/private/var` on macOS). A direct
/// `strip_prefix` is tried first, then both sides are canonicalized.
///
/// Returns `None` if `path` is not inside `root`.
pub fn rebase(root: &Path, path: &Path) -> Option<PathBuf> {
    if path.starts_with(root) {
        return Some(path.to_path_buf());
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(rel) = path.strip_prefix(&root_canon) {
        return Some(root.join(rel));
    }

    // The file may already be gone; canonicalize its parent instead.
    let parent = path.parent()?.canonicalize().ok()?;
    let rel = parent.strip_prefix(&root_canon).ok()?;
    Some(root.join(rel).join(path.file_name()?))
}

/// Forward-slash path of `path` relative to `root`, for logs.
pub fn relative_str(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}

/// Lexically remove `.` and `..` segments, without touching the disk.
///
/// `..` at the root stays at the root. Leading `..` of a relative path are
/// kept.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
