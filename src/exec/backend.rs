// src/exec/backend.rs

//! Pluggable process lifecycle abstraction.
//!
//! The reload loop talks to a [`Lifecycle`] instead of spawning processes
//! itself. Production code uses [`ProcessLifecycle`]; tests provide a fake
//! that records calls and scripts failures without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{RelaunchError, Result};
use crate::exec::child::{ChildHandle, TokioChild};
use crate::exec::kill::{kill_process, CommandRunner, KillPolicy, SystemCommandRunner};
use crate::exec::sink::StdStream;
use crate::exec::toolchain::Toolchain;
use crate::project::Project;
use crate::types::Platform;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Number of trailing stderr lines of a failed build kept in the error.
const BUILD_DIAGNOSTIC_LINES: usize = 20;

/// Build, launch and terminate a project's program.
///
/// Per reload cycle the orchestrator calls `kill`, then `build`, then `run`.
pub trait Lifecycle: Send + Sync {
    /// Build the project. Output is attached to the project's sinks.
    fn build<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>>;

    /// Launch the built program. `quiet` discards its stdout.
    fn run<'a>(
        &'a self,
        project: &'a Project,
        quiet: bool,
    ) -> BoxFuture<'a, Result<Box<dyn ChildHandle>>>;

    /// Terminate a previously launched program. `None` is a no-op.
    fn kill<'a>(
        &'a self,
        child: Option<&'a mut (dyn ChildHandle + 'static)>,
        app_name: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Real lifecycle backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessLifecycle {
    toolchain: Toolchain,
    platform: Platform,
    kill_policy: KillPolicy,
    runner: Arc<dyn CommandRunner>,
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        Self::new(Toolchain::default())
    }
}

impl ProcessLifecycle {
    pub fn new(toolchain: Toolchain) -> Self {
        let platform = Platform::current();
        Self {
            toolchain,
            platform,
            kill_policy: KillPolicy::for_platform(platform),
            runner: Arc::new(SystemCommandRunner),
        }
    }

    pub fn with_kill_policy(mut self, policy: KillPolicy) -> Self {
        self.kill_policy = policy;
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    async fn build_inner(&self, project: &Project) -> Result<()> {
        let name = project.display_name();
        let failed = |message: String| RelaunchError::BuildFailed {
            project: name.clone(),
            message,
        };

        let program = self
            .toolchain
            .build_program()
            .ok_or_else(|| failed("build command is empty".to_string()))?;

        info!(project = %name, cmd = ?self.toolchain.build, "building");

        let mut cmd = Command::new(program);
        cmd.args(self.toolchain.build_args())
            .current_dir(project.dir())
            .stdin(Stdio::null())
            .stdout(project.out.stdio_for(StdStream::Out))
            // Always piped so a failure can carry the toolchain's diagnostics.
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| failed(format!("could not start `{program}`: {e}")))?;

        let stdout_fwd = match child.stdout.take() {
            Some(out) => Some(project.out.forward(out)),
            None => None,
        };
        let stderr_fwd = child
            .stderr
            .take()
            .map(|err| project.err.forward_and_capture(err, BUILD_DIAGNOSTIC_LINES));

        let status = child
            .wait()
            .await
            .map_err(|e| failed(format!("waiting for `{program}`: {e}")))?;

        if let Some(handle) = stdout_fwd {
            let _ = handle.await;
        }
        let diagnostics = match stderr_fwd {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            debug!(project = %name, "build succeeded");
            return Ok(());
        }

        let mut message = format!("`{}` exited with {status}", self.toolchain.build.join(" "));
        if !diagnostics.is_empty() {
            message.push_str(":\n");
            message.push_str(&diagnostics.join("\n"));
        }
        Err(failed(message))
    }

    fn run_inner(&self, project: &Project, quiet: bool) -> Result<Box<dyn ChildHandle>> {
        let name = project.display_name();
        let binary = self.toolchain.artifact_path(project.dir(), self.platform);

        info!(project = %name, binary = ?binary, args = ?project.args, "launching");

        let stdout = if quiet {
            Stdio::null()
        } else {
            project.out.stdio_for(StdStream::Out)
        };

        let mut cmd = Command::new(&binary);
        cmd.args(&project.args)
            .current_dir(project.dir())
            .stdin(Stdio::inherit())
            .stdout(stdout)
            .stderr(project.err.stdio_for(StdStream::Err))
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| RelaunchError::RunFailed {
            project: name.clone(),
            message: format!("could not start {:?}: {e}", binary),
        })?;

        if let Some(out) = child.stdout.take() {
            project.out.forward(out);
        }
        if let Some(err) = child.stderr.take() {
            project.err.forward(err);
        }

        debug!(project = %name, pid = ?child.id(), "program started");
        Ok(Box::new(TokioChild::new(child)))
    }
}

impl Lifecycle for ProcessLifecycle {
    fn build<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.build_inner(project))
    }

    fn run<'a>(
        &'a self,
        project: &'a Project,
        quiet: bool,
    ) -> BoxFuture<'a, Result<Box<dyn ChildHandle>>> {
        Box::pin(async move { self.run_inner(project, quiet) })
    }

    fn kill<'a>(
        &'a self,
        child: Option<&'a mut (dyn ChildHandle + 'static)>,
        app_name: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(kill_process(
            child,
            app_name,
            &self.kill_policy,
            self.runner.as_ref(),
        ))
    }
}
