// src/exec/toolchain.rs

use std::path::{Path, PathBuf};

use crate::types::Platform;

/// How projects are built and where the produced program ends up.
///
/// The default describes the Go toolchain: `go build .` in the directory of
/// the main file, producing a binary named after that directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Build program followed by its arguments.
    pub build: Vec<String>,
    /// Extension of source files, including the leading dot.
    pub source_ext: String,
    /// Main file used when a project is registered with an empty path.
    pub default_main: String,
    /// Directory (relative to the project directory) holding the produced
    /// binary. `None` means the project directory itself.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::go()
    }
}

impl Toolchain {
    pub fn go() -> Self {
        Self {
            build: vec!["go".into(), "build".into(), ".".into()],
            source_ext: ".go".to_string(),
            default_main: "main.go".to_string(),
            artifact_dir: None,
        }
    }

    /// Program name of the build command, or `None` if the command is empty.
    pub fn build_program(&self) -> Option<&str> {
        self.build.first().map(String::as_str)
    }

    pub fn build_args(&self) -> &[String] {
        self.build.get(1..).unwrap_or(&[])
    }

    /// Name of the binary produced for a project living in `dir`.
    pub fn artifact_name(&self, dir: &Path, platform: Platform) -> String {
        let base = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{base}{}", platform.exe_suffix())
    }

    /// Full path of the binary produced for a project living in `dir`.
    pub fn artifact_path(&self, dir: &Path, platform: Platform) -> PathBuf {
        let name = self.artifact_name(dir, platform);
        match &self.artifact_dir {
            Some(sub) => dir.join(sub).join(name),
            None => dir.join(name),
        }
    }
}
