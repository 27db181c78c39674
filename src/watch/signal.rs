// src/watch/signal.rs

//! Notification-driven change detection.
//!
//! The notify callback runs on notify's own thread, so events are bridged
//! into Tokio through an unbounded channel and consumed by [`SignalWatcher::run`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::errors::{RelaunchError, Result};
use crate::exec::BoxFuture;
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::{ProjectId, SharedProject};
use crate::types::WatcherKind;
use crate::watch::coalesce::Coalescer;
use crate::watch::path_utils::{rebase, relative_str};
use crate::watch::stop::StopSignal;
use crate::watch::walk::{accepted_tree, collect_watch_dirs};
use crate::watch::{ChangeDetector, ChangeListener, ErrorListener, Listeners, LoopExit};

/// Quiet period a file must see before its burst of notifications is
/// delivered as one change.
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(100);

type PendingChanges = Coalescer<(ProjectId, PathBuf), SharedProject>;

pub struct SignalWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    fs: Arc<dyn FileSystem>,
    projects: Vec<SharedProject>,
    watched: BTreeSet<PathBuf>,
    listeners: Listeners,
    coalesce_window: Duration,
}

impl std::fmt::Debug for SignalWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalWatcher")
            .field("watched", &self.watched)
            .field("coalesce_window", &self.coalesce_window)
            .finish_non_exhaustive()
    }
}

enum Step {
    Stop(bool),
    Event(Option<notify::Result<Event>>),
    Flush,
}

impl SignalWatcher {
    pub fn new() -> Result<Self> {
        Self::with_coalesce_window(DEFAULT_COALESCE_WINDOW)
    }

    pub fn with_coalesce_window(window: Duration) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only goes away with the watcher itself.
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            events,
            fs: Arc::new(RealFileSystem),
            projects: Vec::new(),
            watched: BTreeSet::new(),
            listeners: Listeners::default(),
            coalesce_window: window,
        })
    }

    /// Filesystem used to enumerate directories to subscribe to.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Directories currently subscribed to, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watched.iter().cloned().collect()
    }

    fn watch_dir(&mut self, dir: &Path) {
        if self.watched.contains(dir) {
            return;
        }
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                trace!(dir = ?dir, "watching directory");
                self.watched.insert(dir.to_path_buf());
            }
            Err(err) => self.listeners.failed(&RelaunchError::WatchError(format!(
                "cannot watch {:?}: {err}",
                dir
            ))),
        }
    }

    fn handle_event(&mut self, event: Event, pending: &mut PendingChanges) {
        trace!(?event, "received notify event");

        match event.kind {
            EventKind::Create(CreateKind::Folder) => {
                for path in &event.paths {
                    self.dir_created(path);
                }
            }
            EventKind::Remove(RemoveKind::Folder) => {
                for path in &event.paths {
                    self.watched.remove(path);
                }
            }
            EventKind::Create(CreateKind::Any) => {
                for path in &event.paths {
                    if self.fs.is_dir(path) {
                        self.dir_created(path);
                    } else {
                        self.file_written(path, pending);
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                for path in &event.paths {
                    if self.fs.is_dir(path) {
                        self.dir_created(path);
                    } else if self.fs.is_file(path) {
                        self.file_written(path, pending);
                    }
                }
            }
            kind if is_content_write(&kind) => {
                for path in &event.paths {
                    self.file_written(path, pending);
                }
            }
            _ => {}
        }
    }

    /// Subscribe to a directory created after startup, together with any
    /// accepted directories already inside it.
    fn dir_created(&mut self, raw: &Path) {
        let mut new_dirs = Vec::new();
        for slot in &self.projects {
            let project = slot.project();
            let Some(dir) = rebase(project.dir(), raw) else {
                continue;
            };
            if dir == project.dir() || !project.accepts_dir(&dir) {
                continue;
            }
            debug!(
                project = %project.display_name(),
                dir = %relative_str(project.dir(), &dir),
                "new directory; adding to watch"
            );
            new_dirs.extend(accepted_tree(self.fs.as_ref(), project, &dir));
        }
        for dir in new_dirs {
            self.watch_dir(&dir);
        }
    }

    fn file_written(&self, raw: &Path, pending: &mut PendingChanges) {
        let now = Instant::now();
        for slot in &self.projects {
            let project = slot.project();
            let Some(path) = rebase(project.dir(), raw) else {
                continue;
            };
            if !project.matches(&path) {
                continue;
            }
            trace!(
                project = %project.display_name(),
                file = %relative_str(project.dir(), &path),
                "source write"
            );
            pending.push((slot.id(), path), Arc::clone(slot), now);
        }
    }

    fn flush(&self, pending: &mut PendingChanges) {
        for ((_, path), slot) in pending.take_due(Instant::now()) {
            debug!(project = %slot.project().display_name(), file = ?path, "change detected");
            self.listeners.changed(&slot, &path);
        }
    }

    async fn run_inner(&mut self, mut stop: StopSignal) -> LoopExit {
        info!(dirs = self.watched.len(), "signal watcher started");
        let mut pending = PendingChanges::new(self.coalesce_window);

        loop {
            let deadline = pending.next_deadline();
            let step = tokio::select! {
                requested = stop.stopped() => Step::Stop(requested),
                event = self.events.recv() => Step::Event(event),
                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => Step::Flush,
            };

            match step {
                Step::Stop(true) => {
                    debug!("signal watcher stopping");
                    return LoopExit::Stopped;
                }
                Step::Stop(false) | Step::Event(None) => return LoopExit::Unexpected,
                Step::Event(Some(Ok(event))) => {
                    self.handle_event(event, &mut pending);
                    if pending.window().is_zero() {
                        self.flush(&mut pending);
                    }
                }
                Step::Event(Some(Err(err))) => {
                    self.listeners.failed(&RelaunchError::Notify(err));
                }
                Step::Flush => self.flush(&mut pending),
            }
        }
    }
}

/// Whether an event kind means a file's content was (re)written.
/// Renames are handled separately since they also cover directories.
fn is_content_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

impl ChangeDetector for SignalWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Signal
    }

    fn subscribe(&mut self, projects: &[SharedProject]) -> Result<()> {
        for slot in projects {
            match collect_watch_dirs(self.fs.as_ref(), slot.project()) {
                Ok(dirs) => {
                    for dir in dirs {
                        self.watch_dir(&dir);
                    }
                }
                Err(err) => self.listeners.failed(&err),
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
