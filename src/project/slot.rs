// src/project/slot.rs

//! Shared runtime state of a registered project.
//!
//! Two locks, two jobs:
//! - `gate` (std mutex, held briefly) owns the debounce bookkeeping and is
//!   readable without waiting for a reload to finish.
//! - `cycle` (tokio mutex) is held for the whole kill → build → run sequence,
//!   so at most one reload per project runs at a time.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::engine::debounce::{Admission, DebounceGate};
use crate::exec::child::ChildHandle;
use crate::project::model::Project;

pub type SharedProject = Arc<ProjectSlot>;

/// Stable identifier of a project inside one supervisor.
pub type ProjectId = usize;

/// State only touched while a reload sequence holds the cycle lock.
#[derive(Debug, Default)]
pub struct CycleState {
    /// Most recently successfully started program, if any.
    pub child: Option<Box<dyn ChildHandle>>,
    /// Number of successful launches so far.
    pub runs: u64,
}

pub struct ProjectSlot {
    id: ProjectId,
    project: Project,
    gate: Mutex<DebounceGate>,
    cycle: tokio::sync::Mutex<CycleState>,
}

impl fmt::Debug for ProjectSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectSlot")
            .field("id", &self.id)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl ProjectSlot {
    /// Wrap a prepared project.
    pub fn new(id: ProjectId, project: Project) -> Self {
        let gate = DebounceGate::new(project.reload_interval, project.settle_delay);
        Self {
            id,
            project,
            gate: Mutex::new(gate),
            cycle: tokio::sync::Mutex::new(CycleState::default()),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    fn gate(&self) -> MutexGuard<'_, DebounceGate> {
        self.gate.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Present a change observed at `at` to the debounce gate.
    pub fn admit(&self, at: Instant, wall: SystemTime) -> Admission {
        self.gate().admit(at, wall)
    }

    /// Effective minimum time between reloads.
    pub fn reload_interval(&self) -> Duration {
        self.gate().interval()
    }

    pub fn last_reload_wall(&self) -> Option<SystemTime> {
        self.gate().last_accepted_wall()
    }

    pub fn accepted_reloads(&self) -> u64 {
        self.gate().accepted_count()
    }

    /// Acquire the reload-sequence lock.
    pub async fn lock_cycle(&self) -> tokio::sync::MutexGuard<'_, CycleState> {
        self.cycle.lock().await
    }
}
