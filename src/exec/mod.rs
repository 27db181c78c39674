// src/exec/mod.rs

//! Process lifecycle layer.
//!
//! Builds projects with the configured toolchain, launches the produced
//! programs with `tokio::process::Command`, and terminates them again.
//!
//! - [`backend`] provides the `Lifecycle` trait and the production
//!   `ProcessLifecycle`; tests replace it with a fake.
//! - [`child`] abstracts a running program behind `ChildHandle`.
//! - [`kill`] holds the per-platform termination escalation.
//! - [`sink`] routes child output to the project's output channels.
//! - [`hooks`] runs on-reload commands.
//! - [`toolchain`] describes the build command and produced artifact.

pub mod backend;
pub mod child;
pub mod hooks;
pub mod kill;
pub mod sink;
pub mod toolchain;

pub use backend::{BoxFuture, Lifecycle, ProcessLifecycle};
pub use child::{ChildHandle, TokioChild};
pub use kill::{kill_process, CommandRunner, ForceKillCommand, KillPolicy, SystemCommandRunner};
pub use sink::{OutputSink, SharedBuffer, StdStream};
pub use toolchain::Toolchain;
