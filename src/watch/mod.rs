// src/watch/mod.rs

//! Change detection.
//!
//! Two strategies implement [`ChangeDetector`]:
//! - [`SignalWatcher`]: OS change notifications via `notify`, one
//!   non-recursive subscription per accepted directory.
//! - [`PollWatcher`]: periodic modification-time walks, for filesystems
//!   where notifications are unreliable.
//!
//! Both turn raw changes into "project X changed because of file Y" and
//! hand that to the change listeners. Neither knows about reloads.

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::RelaunchError;
use crate::exec::BoxFuture;
use crate::project::SharedProject;
use crate::types::WatcherKind;

pub mod coalesce;
pub mod path_utils;
pub mod poll;
pub mod signal;
pub mod stop;
pub mod walk;

pub use coalesce::Coalescer;
pub use poll::{PollWatcher, DEFAULT_POLL_INTERVAL};
pub use signal::{SignalWatcher, DEFAULT_COALESCE_WINDOW};
pub use stop::{StopHandle, StopSignal};

/// Called with the affected project and the changed file.
pub type ChangeListener = Arc<dyn Fn(SharedProject, PathBuf) + Send + Sync>;

/// Called with transport-level failures (subscription or walk errors).
pub type ErrorListener = Arc<dyn Fn(&RelaunchError) + Send + Sync>;

/// Why a detector loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested.
    Stopped,
    /// The event source ended on its own.
    Unexpected,
}

/// A change-detection strategy.
pub trait ChangeDetector: Send {
    fn kind(&self) -> WatcherKind;

    /// Start observing the given projects. Per-directory failures are
    /// reported to the error listeners and do not fail the call.
    fn subscribe(&mut self, projects: &[SharedProject]) -> crate::errors::Result<()>;

    fn on_change(&mut self, listener: ChangeListener);

    fn on_error(&mut self, listener: ErrorListener);

    /// Detect changes until `stop` fires.
    fn run(&mut self, stop: StopSignal) -> BoxFuture<'_, LoopExit>;
}

/// Listener lists shared by both strategies.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    change: Vec<ChangeListener>,
    error: Vec<ErrorListener>,
}

impl Listeners {
    pub(crate) fn add_change(&mut self, listener: ChangeListener) {
        self.change.push(listener);
    }

    pub(crate) fn add_error(&mut self, listener: ErrorListener) {
        self.error.push(listener);
    }

    pub(crate) fn changed(&self, project: &SharedProject, path: &std::path::Path) {
        for listener in &self.change {
            listener(Arc::clone(project), path.to_path_buf());
        }
    }

    pub(crate) fn failed(&self, err: &RelaunchError) {
        tracing::error!(error = %err, "change detection error");
        for listener in &self.error {
            listener(err);
        }
    }
}
