// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod project;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{config_root_dir, load_or_default, ConfigFile};
use crate::engine::{Sources, Supervisor};
use crate::errors::RelaunchError;
use crate::exec::Toolchain;

pub use crate::engine::SupervisorOptions;
pub use crate::project::Project;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading, with CLI overrides
/// - the supervisor and its change-detection strategy
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let cfg = load_or_default(args.config.as_deref(), &cwd)?;
    let config_dir = config_root_dir(args.config.as_deref(), &cwd);

    check_source_files(&args.files, &cfg.toolchain, &cwd)?;
    if args.files.is_empty() && cfg.projects.is_empty() {
        return Err(RelaunchError::ConfigError(format!(
            "no programs to supervise: pass main {} files or add [project.<name>] sections",
            cfg.toolchain.source_ext
        ))
        .into());
    }

    let settings = effective_settings(&args, &cfg);
    let mut supervisor = Supervisor::with_toolchain(cfg.toolchain.clone())
        .with_cwd(&cwd)
        .with_options(settings.supervisor_options());

    supervisor.add_all(cfg.build_projects(&config_dir)?)?;

    let sources: Sources = args
        .files
        .iter()
        .map(|f| (f.clone(), args.args.clone()))
        .collect();

    let stop = supervisor.stop_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; stopping");
        stop.stop();
    });

    let kind = args
        .watcher_kind()
        .or(settings.watcher)
        .unwrap_or_default();
    let detector = supervisor.detector_for(kind)?;
    supervisor.run_with(detector, sources, settings.delay).await?;
    Ok(())
}

/// Config file settings with command-line values layered on top.
fn effective_settings(args: &CliArgs, cfg: &ConfigFile) -> config::Settings {
    let mut settings = cfg.settings.clone();
    if args.delay.is_some() {
        settings.delay = args.delay;
    }
    if !args.on_reload.is_empty() {
        settings.on_reload = args.on_reload.clone();
    }
    settings.disable_rerun_output |= args.quiet_rerun;
    settings
}

/// Every file named on the command line must be an existing source file.
pub fn check_source_files(
    files: &[PathBuf],
    toolchain: &Toolchain,
    cwd: &Path,
) -> errors::Result<()> {
    let ext = toolchain.source_ext.trim_start_matches('.');
    for file in files {
        if !file.extension().is_some_and(|e| e == ext) {
            return Err(RelaunchError::ConfigError(format!(
                "{:?} is not a {} file",
                file, toolchain.source_ext
            )));
        }
        let path = cwd.join(file);
        if !path.is_file() {
            return Err(RelaunchError::ConfigError(format!(
                "file {:?} not found",
                path
            )));
        }
    }
    Ok(())
}
