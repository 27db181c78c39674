// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::types::{parse_duration, WatcherKind};

/// Command-line arguments for `relaunch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "relaunch",
    version,
    about = "Build, run and restart programs whenever their sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Main source files, one per program to supervise.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Arguments passed to every launched program.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,

    /// Change-detection strategy (signal or poll).
    #[arg(long, value_name = "KIND")]
    pub watcher: Option<WatcherKind>,

    /// Shorthand for `--watcher poll`.
    #[arg(long, conflicts_with = "watcher")]
    pub walk: bool,

    /// Wait this long after the first change before reloading (e.g. `2s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub delay: Option<Duration>,

    /// Shell command run before every reload. Repeatable.
    #[arg(long = "on-reload", value_name = "CMD")]
    pub on_reload: Vec<String>,

    /// Discard program stdout after the first run.
    #[arg(long)]
    pub quiet_rerun: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `Relaunch.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RELAUNCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Strategy chosen on the command line, if any.
    pub fn watcher_kind(&self) -> Option<WatcherKind> {
        if self.walk {
            Some(WatcherKind::Poll)
        } else {
            self.watcher
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
