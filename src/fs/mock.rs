// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        modified: SystemTime,
    },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Paths are used verbatim; tests should use absolute paths (e.g. `/proj`).
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned lock only means another test thread panicked mid-update;
        // the map itself is still usable.
        self.files.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.add_file_with_mtime(path, content, SystemTime::now());
    }

    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.entries();
        files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(&mut files, parent);
            Self::link_child(&mut files, parent, &path);
        }
    }

    /// Update the modification time of an existing file.
    pub fn touch(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut files = self.entries();
        if let Some(MockEntry::File { modified: m, .. }) = files.get_mut(path.as_ref()) {
            *m = modified;
        }
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.entries();
        Self::ensure_dir_entry(&mut files, path.as_ref());
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                    children.sort();
                }
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = path.parent() {
            if parent != path && !parent.as_os_str().is_empty() {
                Self::ensure_dir_entry(files, parent);
                Self::link_child(files, parent, path);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.entries().get(path) {
            Some(MockEntry::File { modified, .. }) => Ok(*modified),
            Some(MockEntry::Dir(_)) => Ok(SystemTime::UNIX_EPOCH),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
