// src/engine/reload.rs

//! The per-project reload sequence and the start/stop bracketing around it.
//!
//! A change goes through the debounce gate first (atomic per project), then
//! waits for the project's cycle lock, so accepted reloads of one project
//! run strictly one after another.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::engine::debounce::Admission;
use crate::errors::RelaunchError;
use crate::exec::hooks::run_reload_commands;
use crate::exec::Lifecycle;
use crate::project::{CycleState, Project, ProjectSlot};
use crate::watch::StopHandle;

/// What happened to one change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The file is not relevant to the project.
    Ignored,
    /// Too soon after the previous reload.
    Debounced,
    /// A stop arrived before the sequence could run.
    Cancelled,
    /// Kill, build and run all went through.
    Reloaded,
    /// Build or run failed; reported to the project's error output.
    Failed,
    /// The on-reload hook failed; the supervisor is stopping.
    Fatal,
}

/// State shared by every reload task of one supervisor run.
pub struct ReloadContext {
    lifecycle: Arc<dyn Lifecycle>,
    stop: StopHandle,
    closed: AtomicBool,
    fatal: Mutex<Option<RelaunchError>>,
}

impl std::fmt::Debug for ReloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadContext")
            .field("stopping", &self.stopping())
            .finish_non_exhaustive()
    }
}

impl ReloadContext {
    pub fn new(lifecycle: Arc<dyn Lifecycle>, stop: StopHandle) -> Self {
        Self {
            lifecycle,
            stop,
            closed: AtomicBool::new(false),
            fatal: Mutex::new(None),
        }
    }

    pub fn stopping(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.stop.is_stopped()
    }

    /// Refuse all further reloads, whatever the stop handle says later.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// The error that stopped the supervisor, if any.
    pub fn take_fatal(&self) -> Option<RelaunchError> {
        self.fatal.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    fn set_fatal(&self, err: RelaunchError) {
        let mut slot = self.fatal.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.stop.stop();
    }

    /// Initial build and launch of a freshly registered project.
    pub async fn start(&self, slot: &ProjectSlot) -> ReloadOutcome {
        let mut cycle = slot.lock_cycle().await;
        if self.stopping() {
            return ReloadOutcome::Cancelled;
        }
        self.build_and_run(slot.project(), &mut cycle).await
    }

    /// Handle a change to `changed` observed at `at` (`wall` on the wall
    /// clock).
    pub async fn reload(
        &self,
        slot: &ProjectSlot,
        changed: &Path,
        at: Instant,
        wall: SystemTime,
    ) -> ReloadOutcome {
        let project = slot.project();
        let name = project.display_name();

        if !project.matches(changed) {
            return ReloadOutcome::Ignored;
        }
        if self.stopping() {
            return ReloadOutcome::Cancelled;
        }

        let settle = match slot.admit(at, wall) {
            Admission::Rejected => {
                debug!(project = %name, file = ?changed, "change within reload interval; skipped");
                return ReloadOutcome::Debounced;
            }
            Admission::Accepted { settle } => settle,
        };

        if let Some(delay) = settle {
            info!(project = %name, ?delay, "waiting for changes to settle");
            let mut stop = self.stop.signal();
            tokio::select! {
                _ = sleep(delay) => {}
                _ = stop.stopped() => return ReloadOutcome::Cancelled,
            }
        }

        let mut cycle = slot.lock_cycle().await;
        if self.stopping() {
            return ReloadOutcome::Cancelled;
        }

        info!(project = %name, file = ?changed, "reloading");

        let hook = match &project.on_reload {
            Some(hook) => hook(project, changed)
                .map_err(|e| RelaunchError::HookFailed(format!("{e:#}"))),
            None => run_reload_commands(project, changed).await,
        };
        if let Err(err) = hook {
            error!(project = %name, error = %err, "on-reload hook failed; stopping");
            project.report(&err.to_string());
            self.set_fatal(err);
            return ReloadOutcome::Fatal;
        }

        // The old handle stays in `cycle` until a new program replaces it.
        if let Err(err) = self
            .lifecycle
            .kill(cycle.child.as_deref_mut(), project.app_name())
            .await
        {
            warn!(project = %name, error = %err, "could not stop previous program");
            project.report(&err.to_string());
        }

        let outcome = self.build_and_run(project, &mut cycle).await;
        drop(cycle);

        if outcome == ReloadOutcome::Reloaded {
            if let Some(hook) = &project.on_reloaded {
                if let Err(err) = hook(project, changed) {
                    warn!(project = %name, error = %err, "on-reloaded hook failed");
                    project.report(&format!("on-reloaded hook failed: {err:#}"));
                }
            }
        }
        outcome
    }

    async fn build_and_run(&self, project: &Project, cycle: &mut CycleState) -> ReloadOutcome {
        let name = project.display_name();

        if let Err(err) = self.lifecycle.build(project).await {
            warn!(project = %name, error = %err, "build failed");
            project.report(&err.to_string());
            return ReloadOutcome::Failed;
        }
        if self.stopping() {
            return ReloadOutcome::Cancelled;
        }

        let quiet = project.disable_rerun_output && cycle.runs > 0;
        match self.lifecycle.run(project, quiet).await {
            Ok(child) => {
                cycle.child = Some(child);
                cycle.runs += 1;
                debug!(project = %name, runs = cycle.runs, "program running");
                ReloadOutcome::Reloaded
            }
            Err(err) => {
                warn!(project = %name, error = %err, "launch failed");
                project.report(&err.to_string());
                ReloadOutcome::Failed
            }
        }
    }

    /// Terminate the project's program, waiting for any in-flight reload
    /// first so nothing it starts is left behind.
    pub async fn shutdown(&self, slot: &ProjectSlot) {
        let mut cycle = slot.lock_cycle().await;
        let project = slot.project();
        if let Err(err) = self
            .lifecycle
            .kill(cycle.child.as_deref_mut(), project.app_name())
            .await
        {
            warn!(project = %project.display_name(), error = %err, "could not stop program");
            project.report(&err.to_string());
        }
        cycle.child = None;
    }
}
