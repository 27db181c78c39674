// src/engine/supervisor.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::engine::registry::ProjectRegistry;
use crate::engine::reload::ReloadContext;
use crate::errors::{RelaunchError, Result};
use crate::exec::{Lifecycle, ProcessLifecycle, Toolchain};
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::{Project, SharedProject};
use crate::types::{Platform, WatcherKind};
use crate::watch::{
    ChangeDetector, ErrorListener, LoopExit, PollWatcher, SignalWatcher, StopHandle,
    DEFAULT_COALESCE_WINDOW, DEFAULT_POLL_INTERVAL,
};

/// Main file to arguments, for projects registered by [`Supervisor::run`].
pub type Sources = BTreeMap<PathBuf, Vec<String>>;

/// Supervisor-wide settings.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub coalesce_window: Duration,
    pub poll_interval: Duration,
    /// Applied to projects registered from a [`Sources`] map.
    pub on_reload_commands: Vec<String>,
    /// Applied to projects registered from a [`Sources`] map.
    pub disable_rerun_output: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            on_reload_commands: Vec::new(),
            disable_rerun_output: false,
        }
    }
}

/// Owns the registered projects and drives them: initial build and
/// launch, reloads on change, and termination on stop.
pub struct Supervisor {
    registry: ProjectRegistry,
    lifecycle: Arc<dyn Lifecycle>,
    toolchain: Toolchain,
    fs: Arc<dyn FileSystem>,
    cwd: Option<PathBuf>,
    platform: Platform,
    stop: StopHandle,
    error_listeners: Vec<ErrorListener>,
    watcher_kind: Option<WatcherKind>,
    options: SupervisorOptions,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("registry", &self.registry)
            .field("toolchain", &self.toolchain)
            .field("watcher_kind", &self.watcher_kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(lifecycle: Arc<dyn Lifecycle>, toolchain: Toolchain) -> Self {
        Self {
            registry: ProjectRegistry::new(),
            lifecycle,
            toolchain,
            fs: Arc::new(RealFileSystem),
            cwd: None,
            platform: Platform::current(),
            stop: StopHandle::new(),
            error_listeners: Vec::new(),
            watcher_kind: None,
            options: SupervisorOptions::default(),
        }
    }

    /// Supervisor that really builds and launches programs.
    pub fn with_toolchain(toolchain: Toolchain) -> Self {
        let lifecycle = Arc::new(ProcessLifecycle::new(toolchain.clone()));
        Self::new(lifecycle, toolchain)
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Directory relative main files are resolved against. Defaults to the
    /// process working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Register one project. On failure nothing is registered.
    pub fn add(&mut self, mut project: Project) -> Result<SharedProject> {
        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        project.prepare(&self.toolchain, self.fs.as_ref(), &cwd, self.platform)?;
        let slot = self.registry.insert(project);
        info!(
            project = %slot.project().display_name(),
            dir = ?slot.project().dir(),
            "project registered"
        );
        Ok(slot)
    }

    /// Register several projects, stopping at the first failure. Projects
    /// before the failing one stay registered.
    pub fn add_all<I>(&mut self, projects: I) -> Result<Vec<SharedProject>>
    where
        I: IntoIterator<Item = Project>,
    {
        projects.into_iter().map(|p| self.add(p)).collect()
    }

    pub fn remove_all(&mut self) -> Vec<SharedProject> {
        self.registry.remove_all()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn projects(&self) -> &[SharedProject] {
        self.registry.slots()
    }

    /// Strategy used by the most recent run, if any.
    pub fn watcher_kind(&self) -> Option<WatcherKind> {
        self.watcher_kind
    }

    /// Listen for supervisor-wide errors: watch failures and an unexpected
    /// end of the detection loop.
    pub fn on_error(&mut self, listener: ErrorListener) {
        self.error_listeners.push(listener);
    }

    /// Handle for stopping a run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Build a detector of the given kind from the supervisor options.
    pub fn detector_for(&self, kind: WatcherKind) -> Result<Box<dyn ChangeDetector>> {
        Ok(match kind {
            WatcherKind::Signal => Box::new(
                SignalWatcher::with_coalesce_window(self.options.coalesce_window)?
                    .with_fs(Arc::clone(&self.fs)),
            ),
            WatcherKind::Poll => Box::new(
                PollWatcher::new()
                    .with_interval(self.options.poll_interval)
                    .with_fs(Arc::clone(&self.fs)),
            ),
        })
    }

    /// Run with the strategy of the previous run, or notification-based
    /// detection the first time.
    pub async fn run(&mut self, sources: Sources) -> Result<()> {
        let kind = self.watcher_kind.unwrap_or_default();
        let detector = self.detector_for(kind)?;
        self.run_with(detector, sources, None).await
    }

    /// Run with only a strategy, supervising the already registered
    /// projects.
    pub async fn watch(&mut self, detector: Box<dyn ChangeDetector>) -> Result<()> {
        self.run_with(detector, Sources::new(), None).await
    }

    /// Register `sources` (with `settle` as their settle delay), build and
    /// launch every project, then reload on change until stopped.
    ///
    /// Returns the error of a failed on-reload hook, or `UnexpectedExit` if
    /// the detector ended without a stop request.
    pub async fn run_with(
        &mut self,
        mut detector: Box<dyn ChangeDetector>,
        sources: Sources,
        settle: Option<Duration>,
    ) -> Result<()> {
        self.watcher_kind = Some(detector.kind());

        for (main_file, args) in sources {
            let mut project = Project::new(main_file).with_args(args);
            project.settle_delay = settle;
            project.on_reload_commands = self.options.on_reload_commands.clone();
            project.disable_rerun_output = self.options.disable_rerun_output;
            self.add(project)?;
        }

        let slots = self.registry.slots().to_vec();
        if slots.is_empty() {
            return Err(RelaunchError::ConfigError(
                "no projects to supervise".to_string(),
            ));
        }

        let ctx = Arc::new(ReloadContext::new(
            Arc::clone(&self.lifecycle),
            self.stop.clone(),
        ));

        let listeners = self.error_listeners.clone();
        detector.on_error(Arc::new(move |err: &RelaunchError| {
            for listener in &listeners {
                listener(err);
            }
        }));

        let reload_ctx = Arc::clone(&ctx);
        detector.on_change(Arc::new(move |slot: SharedProject, path: PathBuf| {
            // Capture the notification time before any waiting.
            let at = Instant::now();
            let wall = SystemTime::now();
            let ctx = Arc::clone(&reload_ctx);
            tokio::spawn(async move {
                let outcome = ctx.reload(&slot, &path, at, wall).await;
                debug!(project = %slot.project().display_name(), ?outcome, "change handled");
            });
        }));

        detector.subscribe(&slots)?;

        for slot in &slots {
            ctx.start(slot).await;
        }

        info!(
            projects = slots.len(),
            watcher = %detector.kind(),
            "supervising"
        );
        let exit = detector.run(self.stop.signal()).await;

        if exit == LoopExit::Unexpected {
            let err = RelaunchError::UnexpectedExit;
            error!(error = %err, "change detection ended unexpectedly");
            for listener in &self.error_listeners {
                listener(&err);
            }
        }

        self.stop.stop();
        ctx.close();
        for slot in &slots {
            ctx.shutdown(slot).await;
        }
        drop(detector);
        self.stop.reset();
        info!("all programs stopped");

        if let Some(fatal) = ctx.take_fatal() {
            return Err(fatal);
        }
        match exit {
            LoopExit::Stopped => Ok(()),
            LoopExit::Unexpected => Err(RelaunchError::UnexpectedExit),
        }
    }
}
