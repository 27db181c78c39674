// src/watch/poll.rs

//! Polling change detection.
//!
//! Every interval, each project's tree is walked and the first source file
//! modified after the project's last reload (or after watching started)
//! produces one change notification.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::errors::{RelaunchError, Result};
use crate::exec::BoxFuture;
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::SharedProject;
use crate::types::WatcherKind;
use crate::watch::stop::StopSignal;
use crate::watch::walk::find_modified_source;
use crate::watch::{ChangeDetector, ChangeListener, ErrorListener, Listeners, LoopExit};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1350);

#[derive(Clone)]
pub struct PollWatcher {
    interval: Duration,
    fs: Arc<dyn FileSystem>,
    projects: Vec<SharedProject>,
    listeners: Listeners,
}

impl std::fmt::Debug for PollWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollWatcher")
            .field("interval", &self.interval)
            .field("projects", &self.projects.len())
            .finish_non_exhaustive()
    }
}

impl Default for PollWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PollWatcher {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            fs: Arc::new(RealFileSystem),
            projects: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    fn spawn_project_loop(
        &self,
        slot: SharedProject,
        started: SystemTime,
        mut stop: StopSignal,
    ) -> JoinHandle<()> {
        let fs = Arc::clone(&self.fs);
        let listeners = self.listeners.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop.stopped() => break,
                    _ = ticker.tick() => {}
                }

                let since = match slot.last_reload_wall() {
                    Some(last) => last.max(started),
                    None => started,
                };

                let walk_fs = Arc::clone(&fs);
                let walk_slot = Arc::clone(&slot);
                let walked = tokio::task::spawn_blocking(move || {
                    find_modified_source(walk_fs.as_ref(), walk_slot.project(), since)
                })
                .await;

                match walked {
                    Ok(Ok(Some(path))) => {
                        debug!(project = %slot.project().display_name(), file = ?path, "change detected");
                        listeners.changed(&slot, &path);
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(err)) => listeners.failed(&err),
                    Err(join) => listeners.failed(&RelaunchError::WatchError(format!(
                        "poll walk did not complete: {join}"
                    ))),
                }
            }
        })
    }

    async fn run_inner(&mut self, mut stop: StopSignal) -> LoopExit {
        let started = SystemTime::now();
        info!(
            projects = self.projects.len(),
            interval = ?self.interval,
            "poll watcher started"
        );

        let tasks: Vec<JoinHandle<()>> = self
            .projects
            .iter()
            .map(|slot| self.spawn_project_loop(Arc::clone(slot), started, stop.clone()))
            .collect();

        let requested = stop.stopped().await;
        for task in tasks {
            let _ = task.await;
        }

        if requested {
            debug!("poll watcher stopped");
            LoopExit::Stopped
        } else {
            LoopExit::Unexpected
        }
    }
}

impl ChangeDetector for PollWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Poll
    }

    fn subscribe(&mut self, projects: &[SharedProject]) -> Result<()> {
        for slot in projects {
            let dir = slot.project().dir();
            if !self.fs.is_dir(dir) {
                self.listeners.failed(&RelaunchError::WatchError(format!(
                    "project directory {:?} is not a directory",
                    dir
                )));
            }
            self.projects.push(Arc::clone(slot));
        }
        Ok(())
    }

    fn on_change(&mut self, listener: ChangeListener) {
        self.listeners.add_change(listener);
    }

    fn on_error(&mut self, listener: ErrorListener) {
        self.listeners.add_error(listener);
    }

    fn run(&mut self, stop: StopSignal) -> BoxFuture<'_, LoopExit> {
        Box::pin(self.run_inner(stop))
    }
}
