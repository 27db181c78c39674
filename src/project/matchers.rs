// src/project/matchers.rs

//! Default source-file matcher and directory-acceptance predicates.

use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::errors::{RelaunchError, Result};
use crate::types::Platform;

/// Decides whether a changed file should trigger a reload.
pub type SourceMatcher = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Decides whether a directory should be watched.
pub type DirFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Directory names that are never worth watching.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    "node_modules",
    "vendor",
    "target",
    "bin",
];

/// Matches files whose extension equals `ext`.
///
/// Outside Windows a file name that merely *contains* the extension also
/// matches, so editor temp files such as `main.go~` or `.main.go.swp` still
/// count as a save of the source file.
pub fn default_source_matcher(ext: &str, platform: Platform) -> SourceMatcher {
    let ext = ext.to_string();
    Arc::new(move |path: &Path| source_path_matches(path, &ext, platform))
}

pub fn source_path_matches(path: &Path, ext: &str, platform: Platform) -> bool {
    let bare = ext.trim_start_matches('.');
    if path.extension().is_some_and(|e| e == bare) {
        return true;
    }
    platform != Platform::Windows
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(ext))
}

/// Matcher backed by a regular expression evaluated on the full path.
pub fn regex_matcher(pattern: &str) -> Result<SourceMatcher> {
    let re = Regex::new(pattern).map_err(|e| {
        RelaunchError::ConfigError(format!("invalid matcher regex '{pattern}': {e}"))
    })?;
    Ok(Arc::new(move |path: &Path| re.is_match(&path.to_string_lossy())))
}

/// Directory-acceptance rules for one project.
///
/// A directory is rejected when its base name is in [`DEFAULT_IGNORED_DIRS`]
/// or when either its base name or its path relative to the project root
/// matches one of the extra ignore globs.
#[derive(Debug, Clone)]
pub struct DirIgnore {
    root: std::path::PathBuf,
    globs: GlobSet,
}

impl DirIgnore {
    pub fn new(root: impl Into<std::path::PathBuf>, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).map_err(|e| {
                RelaunchError::ConfigError(format!("invalid ignore glob '{pat}': {e}"))
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| {
            RelaunchError::ConfigError(format!("failed to build ignore glob set: {e}"))
        })?;
        Ok(Self {
            root: root.into(),
            globs,
        })
    }

    pub fn accepts(&self, dir: &Path) -> bool {
        let Some(name) = dir.file_name() else {
            return true;
        };
        let name = name.to_string_lossy();
        if DEFAULT_IGNORED_DIRS.contains(&&*name) {
            return false;
        }
        if self.globs.is_match(&*name) {
            return false;
        }
        match dir.strip_prefix(&self.root) {
            Ok(rel) => {
                let rel = rel.to_string_lossy().replace('\\', "/");
                !self.globs.is_match(rel.as_str())
            }
            Err(_) => true,
        }
    }

    pub fn into_filter(self) -> DirFilter {
        Arc::new(move |dir: &Path| self.accepts(dir))
    }
}
