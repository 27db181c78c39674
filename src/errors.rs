// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Per-project failures (`BuildFailed`, `RunFailed`, `KillFailed`) stay local
//! to the project that produced them. Transport failures (`WatchError`,
//! `Notify`) and `UnexpectedExit` go to the supervisor-wide error listeners.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelaunchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("build failed for '{project}': {message}")]
    BuildFailed { project: String, message: String },

    #[error("failed to run '{project}': {message}")]
    RunFailed { project: String, message: String },

    #[error("failed to kill '{app}': {message}")]
    KillFailed { app: String, message: String },

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("on-reload hook failed: {0}")]
    HookFailed(String),

    #[error("watcher loop exited without a stop request; this is a bug in relaunch")]
    UnexpectedExit,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RelaunchError>;
