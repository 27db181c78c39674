// src/engine/registry.rs

use crate::project::{Project, ProjectId, ProjectSlot, SharedProject};
use std::sync::Arc;

/// Registered projects, in registration order.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    slots: Vec<SharedProject>,
    next_id: ProjectId,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prepared project.
    pub fn insert(&mut self, project: Project) -> SharedProject {
        let slot = Arc::new(ProjectSlot::new(self.next_id, project));
        self.next_id += 1;
        self.slots.push(Arc::clone(&slot));
        slot
    }

    /// Drop every registration, returning what was registered.
    pub fn remove_all(&mut self) -> Vec<SharedProject> {
        std::mem::take(&mut self.slots)
    }

    pub fn slots(&self) -> &[SharedProject] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
