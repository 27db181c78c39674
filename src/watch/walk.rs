// src/watch/walk.rs

//! Directory walks over the [`FileSystem`] abstraction.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::project::Project;

/// Every directory a project's watcher should subscribe to: the project
/// root plus the trees under the subdirectories found at registration.
///
/// Directories added directly under the root later are picked up by the
/// watcher as they appear, not here. An unreadable root is an error.
pub fn collect_watch_dirs(fs: &dyn FileSystem, project: &Project) -> Result<Vec<PathBuf>> {
    let root = project.dir();
    fs.read_dir(root)?;

    let mut dirs = vec![root.to_path_buf()];
    for sub in project.subdirs() {
        if fs.is_dir(sub) {
            dirs.extend(accepted_tree(fs, project, sub));
        }
    }
    Ok(dirs)
}

/// Accepted directories at and below `dir`, `dir` included.
pub fn accepted_tree(fs: &dyn FileSystem, project: &Project, dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(children) = fs.read_dir(&dir) {
            stack.extend(
                children
                    .into_iter()
                    .filter(|c| fs.is_dir(c) && project.accepts_dir(c)),
            );
        }
        out.push(dir);
    }
    out
}

/// Depth-first search for the first source file modified strictly after
/// `since`. Stops at the first hit.
pub fn find_modified_source(
    fs: &dyn FileSystem,
    project: &Project,
    since: SystemTime,
) -> Result<Option<PathBuf>> {
    let ext = project.source_ext();
    let mut stack = vec![project.dir().to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs.read_dir(&dir)?;
        let mut subdirs = Vec::new();

        for path in entries {
            if fs.is_dir(&path) {
                if project.accepts_dir(&path) {
                    subdirs.push(path);
                }
                continue;
            }
            if !has_extension(&path, ext) || !fs.is_file(&path) {
                continue;
            }
            if fs.modified(&path)? > since {
                return Ok(Some(path));
            }
        }

        stack.extend(subdirs.into_iter().rev());
    }

    Ok(None)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    path.extension().is_some_and(|e| e == ext)
}
