// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`debounce`]: the pure per-project rate-limiting policy.
//! - [`reload`]: the hook → kill → build → run sequence.
//! - [`registry`]: registered projects.
//! - [`supervisor`]: ties a change detector to the reload sequence and
//!   owns start-up and shutdown.

pub mod debounce;
pub mod registry;
pub mod reload;
pub mod supervisor;

pub use debounce::{Admission, DebounceGate, MIN_RELOAD_INTERVAL};
pub use registry::ProjectRegistry;
pub use reload::{ReloadContext, ReloadOutcome};
pub use supervisor::{Sources, Supervisor, SupervisorOptions};
