// src/exec/kill.rs

//! Platform-specific termination of a previously launched program.
//!
//! Escalation order:
//! 1. empty handle, already exited or already reaped: nothing to do
//! 2. graceful request (SIGTERM), then wait up to `grace`
//! 3. forced kill through the handle, then wait up to `kill_timeout`
//! 4. platform-native kill command by pid or name
//!
//! A kill command failing because the target is already gone counts as
//! success.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::{RelaunchError, Result};
use crate::exec::child::ChildHandle;
use crate::types::Platform;

/// External command used as the last escalation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceKillCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for ForceKillCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Termination strategy for one platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillPolicy {
    pub platform: Platform,
    /// How long to wait after the graceful request.
    pub grace: Duration,
    /// How long to wait after the forced kill through the handle.
    pub kill_timeout: Duration,
}

impl Default for KillPolicy {
    fn default() -> Self {
        Self::for_platform(Platform::current())
    }
}

impl KillPolicy {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            grace: Duration::from_secs(2),
            kill_timeout: Duration::from_secs(2),
        }
    }

    /// Last-resort kill command for this platform.
    ///
    /// - Windows: `taskkill /F /T /PID <pid>` (kills the whole tree)
    /// - elsewhere: `kill -KILL <pid>`
    ///
    /// Always targets the pid: several projects may share a program name.
    pub fn force_kill_command(&self, pid: u32) -> ForceKillCommand {
        let pid = pid.to_string();
        match self.platform {
            Platform::Windows => ForceKillCommand {
                program: "taskkill".to_string(),
                args: vec!["/F".into(), "/T".into(), "/PID".into(), pid],
            },
            Platform::Darwin | Platform::Other => ForceKillCommand {
                program: "kill".to_string(),
                args: vec!["-KILL".into(), pid],
            },
        }
    }

    /// Whether a kill command exit code means "no such process".
    ///
    /// `taskkill` exits with 128 when the pid is unknown; `kill` exits
    /// with 1 when the pid is unknown.
    pub fn is_already_gone(&self, exit_code: Option<i32>) -> bool {
        match (self.platform, exit_code) {
            (Platform::Windows, Some(128)) => true,
            (Platform::Darwin | Platform::Other, Some(1)) => true,
            _ => false,
        }
    }
}

/// Runs the last-resort kill command and reports its exit code.
pub trait CommandRunner: Send + Sync + fmt::Debug {
    fn exit_code<'a>(
        &'a self,
        command: &'a ForceKillCommand,
    ) -> Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send + 'a>>;
}

/// Runs commands on the host system.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn exit_code<'a>(
        &'a self,
        command: &'a ForceKillCommand,
    ) -> Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send + 'a>> {
        Box::pin(async move {
            let status = Command::new(&command.program)
                .args(&command.args)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await?;
            Ok(status.code())
        })
    }
}

/// Terminate `child` following `policy`.
///
/// `None`, an exited process and a reaped process are all no-ops.
pub async fn kill_process(
    child: Option<&mut (dyn ChildHandle + 'static)>,
    app_name: &str,
    policy: &KillPolicy,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let Some(child) = child else {
        return Ok(());
    };

    match child.has_exited() {
        Ok(true) => {
            debug!(app = %app_name, "process already exited; nothing to kill");
            return Ok(());
        }
        Ok(false) => {}
        Err(err) => {
            debug!(app = %app_name, error = %err, "could not query process state");
        }
    }

    let Some(pid) = child.id() else {
        return Ok(());
    };

    match child.request_terminate() {
        Ok(()) => {
            if wait_bounded(child, policy.grace).await {
                debug!(app = %app_name, pid, "process exited after graceful request");
                return Ok(());
            }
            debug!(app = %app_name, pid, "graceful request timed out; escalating");
        }
        Err(err) => {
            debug!(app = %app_name, pid, error = %err, "graceful request unavailable");
        }
    }

    match child.start_kill() {
        Ok(()) => {
            if wait_bounded(child, policy.kill_timeout).await {
                debug!(app = %app_name, pid, "process killed");
                return Ok(());
            }
            warn!(app = %app_name, pid, "process did not exit after kill; forcing");
        }
        Err(err) => {
            warn!(app = %app_name, pid, error = %err, "kill through handle failed; forcing");
        }
    }

    force_kill(pid, app_name, policy, runner).await
}

/// `true` if the child exited within `limit`.
async fn wait_bounded(child: &mut (dyn ChildHandle + 'static), limit: Duration) -> bool {
    matches!(timeout(limit, child.wait()).await, Ok(Ok(())))
}

async fn force_kill(
    pid: u32,
    app_name: &str,
    policy: &KillPolicy,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let command = policy.force_kill_command(pid);
    info!(app = %app_name, pid, command = %command, "running forced kill command");

    let failed = |message: String| RelaunchError::KillFailed {
        app: app_name.to_string(),
        message,
    };

    match runner.exit_code(&command).await {
        Ok(Some(0)) => Ok(()),
        Ok(code) if policy.is_already_gone(code) => {
            debug!(app = %app_name, pid, ?code, "process already gone");
            Ok(())
        }
        Ok(code) => Err(failed(format!("`{command}` exited with {code:?}"))),
        Err(err) => Err(failed(format!("`{command}` could not be started: {err}"))),
    }
}
