// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::SupervisorOptions;
use crate::errors::Result;
use crate::exec::Toolchain;
use crate::project::matchers::regex_matcher;
use crate::project::Project;
use crate::types::WatcherKind;

/// Configuration as read from `Relaunch.toml`, before validation.
///
/// ```toml
/// [config]
/// watcher = "poll"
/// delay = "2s"
/// on_reload = ["./notify.sh"]
///
/// [toolchain]
/// build = ["go", "build", "."]
/// source_ext = ".go"
///
/// [project.api]
/// main = "cmd/api/main.go"
/// args = ["-port", "8080"]
/// reload_interval = "3s"
/// ignore = ["testdata"]
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,

    #[serde(default)]
    pub toolchain: RawToolchain,

    /// Projects keyed by name, from `[project.<name>]`.
    #[serde(default)]
    pub project: BTreeMap<String, RawProject>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigSection {
    #[serde(default)]
    pub watcher: Option<WatcherKind>,

    /// Settle delay before the first reload, e.g. `"2s"`.
    #[serde(default)]
    pub delay: Option<String>,

    /// Shell commands run before every reload.
    #[serde(default)]
    pub on_reload: Vec<String>,

    #[serde(default)]
    pub disable_rerun_output: bool,

    #[serde(default)]
    pub coalesce_window: Option<String>,

    #[serde(default)]
    pub poll_interval: Option<String>,
}

/// `[toolchain]` section. Missing keys fall back to the Go toolchain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawToolchain {
    #[serde(default)]
    pub build: Option<Vec<String>>,

    #[serde(default)]
    pub source_ext: Option<String>,

    #[serde(default)]
    pub default_main: Option<String>,

    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

/// `[project.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProject {
    /// Main source file. Relative paths are resolved against the directory
    /// holding the config file.
    #[serde(default)]
    pub main: Option<PathBuf>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub reload_interval: Option<String>,

    #[serde(default)]
    pub settle_delay: Option<String>,

    /// Extra directory ignore globs.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Regex replacing the default source matcher.
    #[serde(default)]
    pub matcher: Option<String>,

    #[serde(default)]
    pub disable_rerun_output: Option<bool>,

    /// Overrides `[config].on_reload` for this project.
    #[serde(default)]
    pub on_reload: Option<Vec<String>>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub toolchain: Toolchain,
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// Validated `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` when the file did not choose a strategy.
    pub watcher: Option<WatcherKind>,
    pub delay: Option<Duration>,
    pub on_reload: Vec<String>,
    pub disable_rerun_output: bool,
    pub coalesce_window: Duration,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let options = SupervisorOptions::default();
        Self {
            watcher: None,
            delay: None,
            on_reload: Vec::new(),
            disable_rerun_output: false,
            coalesce_window: options.coalesce_window,
            poll_interval: options.poll_interval,
        }
    }
}

impl Settings {
    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            coalesce_window: self.coalesce_window,
            poll_interval: self.poll_interval,
            on_reload_commands: self.on_reload.clone(),
            disable_rerun_output: self.disable_rerun_output,
        }
    }
}

/// Validated `[project.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub main: PathBuf,
    pub args: Vec<String>,
    pub reload_interval: Option<Duration>,
    pub settle_delay: Option<Duration>,
    pub ignore: Vec<String>,
    pub matcher: Option<String>,
    pub disable_rerun_output: Option<bool>,
    pub on_reload: Option<Vec<String>>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: Settings,
        toolchain: Toolchain,
        projects: BTreeMap<String, ProjectConfig>,
    ) -> Self {
        Self {
            settings,
            toolchain,
            projects,
        }
    }

    /// Build the configured projects, resolving relative main files
    /// against `base_dir`.
    pub fn build_projects(&self, base_dir: &Path) -> Result<Vec<Project>> {
        self.projects
            .iter()
            .map(|(name, cfg)| cfg.to_project(name, &self.settings, base_dir))
            .collect()
    }
}

impl ProjectConfig {
    pub fn to_project(&self, name: &str, settings: &Settings, base_dir: &Path) -> Result<Project> {
        let main = if self.main.is_absolute() || self.main.as_os_str().is_empty() {
            self.main.clone()
        } else {
            base_dir.join(&self.main)
        };

        let mut project = Project::new(main)
            .with_name(name)
            .with_args(self.args.iter().cloned());
        project.reload_interval = self.reload_interval;
        project.settle_delay = self.settle_delay.or(settings.delay);
        project.ignore = self.ignore.clone();
        project.on_reload_commands = self
            .on_reload
            .clone()
            .unwrap_or_else(|| settings.on_reload.clone());
        project.disable_rerun_output = self
            .disable_rerun_output
            .unwrap_or(settings.disable_rerun_output);
        if let Some(pattern) = &self.matcher {
            project = project.with_matcher(regex_matcher(pattern)?);
        }
        Ok(project)
    }
}
