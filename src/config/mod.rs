// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed raw model and the validated model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: `TryFrom<RawConfigFile> for ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, load_and_validate, load_from_path, load_or_default, DEFAULT_CONFIG_FILE};
pub use model::{ConfigFile, ProjectConfig, RawConfigFile, Settings};
