// src/exec/child.rs

//! Handle to a running child program.
//!
//! The kill escalation in [`super::kill`] only talks to [`ChildHandle`], so
//! tests can substitute a fake process with scripted behaviour.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::process::Child;

pub trait ChildHandle: Send + fmt::Debug {
    /// OS process id, `None` once the process has been reaped.
    fn id(&self) -> Option<u32>;

    /// Non-blocking check whether the process already exited.
    fn has_exited(&mut self) -> io::Result<bool>;

    /// Ask the process to shut down gracefully (SIGTERM on Unix).
    ///
    /// Platforms without a graceful request return `ErrorKind::Unsupported`.
    fn request_terminate(&mut self) -> io::Result<()>;

    /// Forcefully kill the process without waiting for it.
    fn start_kill(&mut self) -> io::Result<()>;

    /// Wait for the process to exit.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>>;
}

/// Real child process spawned through `tokio::process`.
pub struct TokioChild {
    child: Child,
}

impl TokioChild {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

impl fmt::Debug for TokioChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioChild")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl ChildHandle for TokioChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    #[cfg(unix)]
    fn request_terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = self
            .child
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn request_terminate(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "graceful termination is not available on this platform",
        ))
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.child.wait().await?;
            Ok(())
        })
    }
}
