use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use relaunch::errors::{RelaunchError, Result};
use relaunch::exec::{BoxFuture, ChildHandle, Lifecycle};
use relaunch::project::Project;

/// One call made against a [`FakeLifecycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCall {
    Build { project: String },
    Run { project: String, quiet: bool },
    Kill { app: String, pid: Option<u32> },
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<LifecycleCall>,
    build_failures: VecDeque<String>,
    run_failures: VecDeque<String>,
    kill_failure: Option<String>,
    build_delay: Option<Duration>,
    children: Vec<FakeChild>,
    next_pid: u32,
}

/// A lifecycle that never touches the OS:
/// - records every build/run/kill call in order
/// - hands out [`FakeChild`] handles from `run`
/// - fails builds, runs or kills on request
#[derive(Debug, Clone, Default)]
pub struct FakeLifecycle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Make the next build fail with `message`.
    pub fn fail_next_build(&self, message: &str) {
        self.state().build_failures.push_back(message.to_string());
    }

    /// Make the next run fail with `message`.
    pub fn fail_next_run(&self, message: &str) {
        self.state().run_failures.push_back(message.to_string());
    }

    /// Make every kill fail with `message`.
    pub fn fail_kills(&self, message: &str) {
        self.state().kill_failure = Some(message.to_string());
    }

    /// Make every build take `delay`.
    pub fn with_build_delay(self, delay: Duration) -> Self {
        self.state().build_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<LifecycleCall> {
        self.state().calls.clone()
    }

    pub fn builds(&self) -> usize {
        self.count(|c| matches!(c, LifecycleCall::Build { .. }))
    }

    pub fn runs(&self) -> usize {
        self.count(|c| matches!(c, LifecycleCall::Run { .. }))
    }

    /// Kill calls that had a program to kill.
    pub fn kills(&self) -> usize {
        self.count(|c| matches!(c, LifecycleCall::Kill { pid: Some(_), .. }))
    }

    fn count(&self, pred: impl Fn(&LifecycleCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    /// Every child handed out so far, oldest first.
    pub fn children(&self) -> Vec<FakeChild> {
        self.state().children.clone()
    }

    /// Children that were started and never killed.
    pub fn running_children(&self) -> usize {
        self.state()
            .children
            .iter()
            .filter(|c| c.is_running())
            .count()
    }
}

impl Lifecycle for FakeLifecycle {
    fn build<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let (delay, failure) = {
                let mut state = self.state();
                state.calls.push(LifecycleCall::Build {
                    project: project.display_name(),
                });
                (state.build_delay, state.build_failures.pop_front())
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(RelaunchError::BuildFailed {
                    project: project.display_name(),
                    message,
                }),
                None => Ok(()),
            }
        })
    }

    fn run<'a>(
        &'a self,
        project: &'a Project,
        quiet: bool,
    ) -> BoxFuture<'a, Result<Box<dyn ChildHandle>>> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(LifecycleCall::Run {
                project: project.display_name(),
                quiet,
            });
            if let Some(message) = state.run_failures.pop_front() {
                return Err(RelaunchError::RunFailed {
                    project: project.display_name(),
                    message,
                });
            }
            state.next_pid += 1;
            let child = FakeChild::new(1000 + state.next_pid);
            state.children.push(child.clone());
            Ok(Box::new(child) as Box<dyn ChildHandle>)
        })
    }

    fn kill<'a>(
        &'a self,
        child: Option<&'a mut (dyn ChildHandle + 'static)>,
        app_name: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let failure = {
                let mut state = self.state();
                state.calls.push(LifecycleCall::Kill {
                    app: app_name.to_string(),
                    pid: child.as_ref().and_then(|c| c.id()),
                });
                state.kill_failure.clone()
            };
            if let Some(message) = failure {
                return Err(RelaunchError::KillFailed {
                    app: app_name.to_string(),
                    message,
                });
            }
            if let Some(child) = child {
                let _ = child.start_kill();
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
struct FakeChildState {
    exited: bool,
    ignores_terminate: bool,
    ignores_kill: bool,
    terminate_requests: u32,
    kill_requests: u32,
}

/// Scriptable stand-in for a running program.
///
/// Clones share state, so a test can keep one clone and inspect what the
/// code under test did to the other.
#[derive(Debug, Clone)]
pub struct FakeChild {
    pid: u32,
    state: Arc<Mutex<FakeChildState>>,
}

impl FakeChild {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            state: Arc::default(),
        }
    }

    /// A program that already exited on its own.
    pub fn exited(pid: u32) -> Self {
        let child = Self::new(pid);
        child.state().exited = true;
        child
    }

    /// A program that only dies from a forced kill.
    pub fn ignoring_terminate(pid: u32) -> Self {
        let child = Self::new(pid);
        child.state().ignores_terminate = true;
        child
    }

    /// A program that survives both the graceful request and the kill.
    pub fn stubborn(pid: u32) -> Self {
        let child = Self::new(pid);
        {
            let mut state = child.state();
            state.ignores_terminate = true;
            state.ignores_kill = true;
        }
        child
    }

    fn state(&self) -> MutexGuard<'_, FakeChildState> {
        self.state.lock().unwrap()
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        !self.state().exited
    }

    pub fn terminate_requests(&self) -> u32 {
        self.state().terminate_requests
    }

    pub fn kill_requests(&self) -> u32 {
        self.state().kill_requests
    }
}

impl ChildHandle for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.state().exited)
    }

    fn request_terminate(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.terminate_requests += 1;
        if !state.ignores_terminate {
            state.exited = true;
        }
        Ok(())
    }

    fn start_kill(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.kill_requests += 1;
        if !state.ignores_kill {
            state.exited = true;
        }
        Ok(())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async move {
            loop {
                let exited = self.state().exited;
                if exited {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    }
}
