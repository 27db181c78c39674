// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "Relaunch.toml";

/// Read and deserialize a config file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Read, deserialize and validate a config file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Load the configuration for a run.
///
/// An explicitly given path must exist. Without one, `Relaunch.toml` in
/// `cwd` is used if present, and built-in defaults otherwise.
pub fn load_or_default(explicit: Option<&Path>, cwd: &Path) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = cwd.join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                load_and_validate(path)
            } else {
                ConfigFile::try_from(RawConfigFile::default())
            }
        }
    }
}

/// Directory relative paths in a config file are resolved against.
pub fn config_root_dir(config_path: Option<&Path>, cwd: &Path) -> PathBuf {
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd.to_path_buf(),
    }
}
