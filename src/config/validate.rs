// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::model::{
    ConfigFile, ProjectConfig, RawConfigFile, RawConfigSection, RawProject, RawToolchain,
    Settings,
};
use crate::errors::{RelaunchError, Result};
use crate::exec::Toolchain;
use crate::project::matchers::{regex_matcher, DirIgnore};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RelaunchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let settings = validate_settings(&raw.config)?;
        let toolchain = validate_toolchain(raw.toolchain)?;
        let projects = raw
            .project
            .into_iter()
            .map(|(name, p)| validate_project(&name, p).map(|p| (name, p)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(ConfigFile::new_unchecked(settings, toolchain, projects))
    }
}

fn validate_settings(raw: &RawConfigSection) -> Result<Settings> {
    let defaults = Settings::default();
    let coalesce_window = optional_duration("[config].coalesce_window", &raw.coalesce_window)?
        .unwrap_or(defaults.coalesce_window);
    let poll_interval = optional_duration("[config].poll_interval", &raw.poll_interval)?
        .unwrap_or(defaults.poll_interval);

    if poll_interval.is_zero() {
        return Err(RelaunchError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }
    if raw.on_reload.iter().any(|c| c.trim().is_empty()) {
        return Err(RelaunchError::ConfigError(
            "[config].on_reload must not contain empty commands".to_string(),
        ));
    }

    Ok(Settings {
        watcher: raw.watcher,
        delay: optional_duration("[config].delay", &raw.delay)?,
        on_reload: raw.on_reload.clone(),
        disable_rerun_output: raw.disable_rerun_output,
        coalesce_window,
        poll_interval,
    })
}

fn validate_toolchain(raw: RawToolchain) -> Result<Toolchain> {
    let mut toolchain = Toolchain::default();

    if let Some(build) = raw.build {
        if build.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(RelaunchError::ConfigError(
                "[toolchain].build must name a program".to_string(),
            ));
        }
        toolchain.build = build;
    }
    if let Some(ext) = raw.source_ext {
        let ext = ext.trim();
        if ext.is_empty() || ext == "." {
            return Err(RelaunchError::ConfigError(
                "[toolchain].source_ext must not be empty".to_string(),
            ));
        }
        toolchain.source_ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
    }
    if let Some(main) = raw.default_main {
        toolchain.default_main = main;
    }
    if let Some(dir) = raw.artifact_dir {
        if dir.is_absolute() {
            return Err(RelaunchError::ConfigError(format!(
                "[toolchain].artifact_dir must be relative to the project (got {:?})",
                dir
            )));
        }
        toolchain.artifact_dir = Some(dir);
    }

    Ok(toolchain)
}

fn validate_project(name: &str, raw: RawProject) -> Result<ProjectConfig> {
    let field = |f: &str| format!("[project.{name}].{f}");

    if let Some(pattern) = &raw.matcher {
        regex_matcher(pattern)?;
    }
    // Only the glob syntax is checked here; the root is filled in later.
    DirIgnore::new("", &raw.ignore)?;

    Ok(ProjectConfig {
        main: raw.main.unwrap_or_default(),
        args: raw.args,
        reload_interval: optional_duration(&field("reload_interval"), &raw.reload_interval)?,
        settle_delay: optional_duration(&field("settle_delay"), &raw.settle_delay)?,
        ignore: raw.ignore,
        matcher: raw.matcher,
        disable_rerun_output: raw.disable_rerun_output,
        on_reload: raw.on_reload,
    })
}

fn optional_duration(field: &str, value: &Option<String>) -> Result<Option<Duration>> {
    value
        .as_deref()
        .map(|s| {
            parse_duration(s)
                .map_err(|e| RelaunchError::ConfigError(format!("{field}: {e}")))
        })
        .transpose()
}
