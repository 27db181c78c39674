// src/project/mod.rs

//! The supervised program data model.
//!
//! - [`model`] holds the user-facing [`Project`] description and its
//!   normalization.
//! - [`matchers`] has the default file and directory predicates.
//! - [`slot`] wraps a prepared project with its mutable runtime state.

pub mod matchers;
pub mod model;
pub mod slot;

pub use matchers::{DirFilter, DirIgnore, SourceMatcher, DEFAULT_IGNORED_DIRS};
pub use model::{Project, ReloadHook};
pub use slot::{CycleState, ProjectId, ProjectSlot, SharedProject};
