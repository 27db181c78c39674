// src/exec/hooks.rs

//! Default on-reload behaviour: run the operator's commands before a reload.

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::errors::{RelaunchError, Result};
use crate::exec::sink::StdStream;
use crate::project::Project;

/// Environment variable holding the changed file for on-reload commands.
pub const CHANGED_PATH_ENV: &str = "RELAUNCH_CHANGED_PATH";

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Run every configured on-reload command in order, in the project
/// directory, stopping at the first failure.
///
/// Any failure is returned as `HookFailed`, which the supervisor treats as
/// fatal.
pub async fn run_reload_commands(project: &Project, changed: &Path) -> Result<()> {
    for line in &project.on_reload_commands {
        info!(project = %project.display_name(), cmd = %line, "running on-reload command");

        let mut cmd = shell_command(line);
        cmd.current_dir(project.dir())
            .env(CHANGED_PATH_ENV, changed)
            .stdout(project.out.stdio_for(StdStream::Out))
            .stderr(project.err.stdio_for(StdStream::Err));

        let mut child = cmd
            .spawn()
            .map_err(|e| RelaunchError::HookFailed(format!("could not start `{line}`: {e}")))?;

        let fwd_out = child.stdout.take().map(|out| project.out.forward(out));
        let fwd_err = child.stderr.take().map(|err| project.err.forward(err));

        let status = child
            .wait()
            .await
            .map_err(|e| RelaunchError::HookFailed(format!("waiting for `{line}`: {e}")))?;

        for handle in [fwd_out, fwd_err].into_iter().flatten() {
            let _ = handle.await;
        }

        if !status.success() {
            return Err(RelaunchError::HookFailed(format!(
                "`{line}` exited with {status}"
            )));
        }
    }
    Ok(())
}
