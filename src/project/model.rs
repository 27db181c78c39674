// src/project/model.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::engine::debounce::clamp_interval;
use crate::errors::{RelaunchError, Result};
use crate::exec::sink::OutputSink;
use crate::exec::toolchain::Toolchain;
use crate::fs::FileSystem;
use crate::project::matchers::{
    default_source_matcher, DirFilter, DirIgnore, SourceMatcher,
};
use crate::types::Platform;
use crate::watch::path_utils::clean;

/// Lifecycle callback, called with the project and the changed file.
///
/// An `Err` from an on-reload hook is fatal to the whole supervisor.
pub type ReloadHook = Arc<dyn Fn(&Project, &Path) -> anyhow::Result<()> + Send + Sync>;

/// One supervised program.
///
/// Construct with [`Project::new`], adjust with the builder methods, then
/// hand it to the supervisor, which normalizes it with [`Project::prepare`].
#[derive(Clone)]
pub struct Project {
    /// Optional human-readable name used in reports.
    pub name: Option<String>,
    /// Main source file; absolute after `prepare`.
    pub main_file: PathBuf,
    /// Arguments passed to the launched program.
    pub args: Vec<String>,
    pub matcher: Option<SourceMatcher>,
    pub dir_filter: Option<DirFilter>,
    /// Extra directory ignore globs, used to build the default `dir_filter`.
    pub ignore: Vec<String>,
    /// Minimum time between two reloads. `None` means "not set explicitly".
    pub reload_interval: Option<Duration>,
    /// Extra delay before acting on the first detected change.
    pub settle_delay: Option<Duration>,
    /// Replaces the default on-reload behaviour (running
    /// `on_reload_commands`).
    pub on_reload: Option<ReloadHook>,
    pub on_reloaded: Option<ReloadHook>,
    /// Shell commands run before every reload when no custom hook is set.
    pub on_reload_commands: Vec<String>,
    /// Discard program stdout after the first successful run.
    pub disable_rerun_output: bool,
    pub out: OutputSink,
    pub err: OutputSink,

    dir: PathBuf,
    subdirs: Vec<PathBuf>,
    source_ext: String,
    app_name: String,
    prepared: bool,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("main_file", &self.main_file)
            .field("args", &self.args)
            .field("dir", &self.dir)
            .field("subdirs", &self.subdirs)
            .field("reload_interval", &self.reload_interval)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl Project {
    pub fn new(main_file: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            main_file: main_file.into(),
            args: Vec::new(),
            matcher: None,
            dir_filter: None,
            ignore: Vec::new(),
            reload_interval: None,
            settle_delay: None,
            on_reload: None,
            on_reloaded: None,
            on_reload_commands: Vec::new(),
            disable_rerun_output: false,
            out: OutputSink::Stdout,
            err: OutputSink::Stderr,
            dir: PathBuf::new(),
            subdirs: Vec::new(),
            source_ext: String::new(),
            app_name: String::new(),
            prepared: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = Some(interval);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn with_matcher(mut self, matcher: SourceMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_dir_filter(mut self, filter: DirFilter) -> Self {
        self.dir_filter = Some(filter);
        self
    }

    pub fn with_output(mut self, out: OutputSink, err: OutputSink) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    pub fn on_reload(mut self, hook: ReloadHook) -> Self {
        self.on_reload = Some(hook);
        self
    }

    pub fn on_reloaded(mut self, hook: ReloadHook) -> Self {
        self.on_reloaded = Some(hook);
        self
    }

    /// Resolve paths and fill in defaults.
    ///
    /// Fails with a configuration error if the project directory cannot be
    /// listed; nothing is modified in that case.
    pub fn prepare(
        &mut self,
        toolchain: &Toolchain,
        fs: &dyn FileSystem,
        cwd: &Path,
        platform: Platform,
    ) -> Result<()> {
        let main_file = if self.main_file.as_os_str().is_empty() {
            PathBuf::from(&toolchain.default_main)
        } else {
            self.main_file.clone()
        };
        let main_file = if main_file.is_absolute() {
            clean(&main_file)
        } else {
            clean(&cwd.join(main_file))
        };

        let dir = main_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                RelaunchError::ConfigError(format!(
                    "main file {:?} has no parent directory",
                    main_file
                ))
            })?;

        let entries = fs.read_dir(&dir).map_err(|e| {
            RelaunchError::ConfigError(format!(
                "cannot list project directory {:?}: {e:#}",
                dir
            ))
        })?;

        let dir_filter = match self.dir_filter.take() {
            Some(filter) => filter,
            None => DirIgnore::new(&dir, &self.ignore)?.into_filter(),
        };

        let subdirs: Vec<PathBuf> = entries
            .into_iter()
            .filter(|p| fs.is_dir(p) && dir_filter(p))
            .collect();

        if self.matcher.is_none() {
            self.matcher = Some(default_source_matcher(&toolchain.source_ext, platform));
        }
        self.dir_filter = Some(dir_filter);
        self.reload_interval = self.reload_interval.map(clamp_interval);
        self.app_name = toolchain.artifact_name(&dir, platform);
        self.source_ext = toolchain.source_ext.clone();
        self.main_file = main_file;
        self.dir = dir;
        self.subdirs = subdirs;
        self.prepared = true;

        debug!(
            project = %self.display_name(),
            dir = ?self.dir,
            subdirs = self.subdirs.len(),
            "project prepared"
        );
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Directory containing the main file (the build working directory).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Accepted immediate subdirectories found at registration time.
    pub fn subdirs(&self) -> &[PathBuf] {
        &self.subdirs
    }

    /// Base name of the produced program, including any platform suffix.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    /// Name used in logs and reports: the explicit name, else the app name.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None if !self.app_name.is_empty() => self.app_name.clone(),
            None => self.main_file.display().to_string(),
        }
    }

    /// Whether a changed file is relevant to this project.
    pub fn matches(&self, path: &Path) -> bool {
        match &self.matcher {
            Some(m) => m(path),
            None => false,
        }
    }

    /// Whether a directory may be watched for this project.
    pub fn accepts_dir(&self, dir: &Path) -> bool {
        match &self.dir_filter {
            Some(f) => f(dir),
            None => true,
        }
    }

    /// Whether `path` is inside this project's directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }

    /// Write a one-line failure report to this project's error sink.
    pub fn report(&self, message: &str) {
        let line = match &self.name {
            Some(name) => format!("[{name}] {message}"),
            None => message.to_string(),
        };
        self.err.write_line(&line);
    }
}
