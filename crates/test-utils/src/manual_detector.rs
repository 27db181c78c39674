use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use relaunch::errors::{RelaunchError, Result};
use relaunch::exec::BoxFuture;
use relaunch::project::SharedProject;
use relaunch::types::WatcherKind;
use relaunch::watch::{ChangeDetector, ChangeListener, ErrorListener, LoopExit, StopSignal};

#[derive(Debug)]
enum Command {
    Change(PathBuf),
    Error(String),
    End,
}

/// Test side of a [`ManualDetector`].
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    tx: mpsc::UnboundedSender<Command>,
    running: watch::Receiver<bool>,
}

impl ManualTrigger {
    /// Report a change to `path` to every project containing it.
    pub fn change(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(Command::Change(path.into()));
    }

    /// Report a transport error.
    pub fn error(&self, message: &str) {
        let _ = self.tx.send(Command::Error(message.to_string()));
    }

    /// End the detection loop without a stop request.
    pub fn end(&self) {
        let _ = self.tx.send(Command::End);
    }

    /// Resolve once the supervisor entered the detection loop, i.e. every
    /// project has been built and launched once.
    pub async fn running(&self) {
        let mut rx = self.running.clone();
        let _ = rx.wait_for(|r| *r).await;
    }
}

/// Change detector driven entirely by the test through a [`ManualTrigger`].
pub struct ManualDetector {
    rx: mpsc::UnboundedReceiver<Command>,
    running: watch::Sender<bool>,
    projects: Vec<SharedProject>,
    change: Vec<ChangeListener>,
    error: Vec<ErrorListener>,
}

impl ManualDetector {
    pub fn new() -> (Self, ManualTrigger) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (running_tx, running_rx) = watch::channel(false);
        let detector = Self {
            rx,
            running: running_tx,
            projects: Vec::new(),
            change: Vec::new(),
            error: Vec::new(),
        };
        let trigger = ManualTrigger {
            tx,
            running: running_rx,
        };
        (detector, trigger)
    }

    fn dispatch(&self, command: Command) -> bool {
        match command {
            Command::Change(path) => {
                for slot in &self.projects {
                    if slot.project().contains(&path) {
                        for listener in &self.change {
                            listener(Arc::clone(slot), path.clone());
                        }
                    }
                }
                true
            }
            Command::Error(message) => {
                let err = RelaunchError::WatchError(message);
                for listener in &self.error {
                    listener(&err);
                }
                true
            }
            Command::End => false,
        }
    }
}

impl ChangeDetector for ManualDetector {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Signal
    }

    fn subscribe(&mut self, projects: &[SharedProject]) -> Result<()> {
        self.projects.extend(projects.iter().cloned());
        Ok(())
    }

    fn on_change(&mut self, listener: ChangeListener) {
        self.change.push(listener);
    }

    fn on_error(&mut self, listener: ErrorListener) {
        self.error.push(listener);
    }

    fn run(&mut self, mut stop: StopSignal) -> BoxFuture<'_, LoopExit> {
        Box::pin(async move {
            self.running.send_replace(true);
            loop {
                let command = tokio::select! {
                    _ = stop.stopped() => return LoopExit::Stopped,
                    command = self.rx.recv() => command,
                };
                match command {
                    Some(command) => {
                        if !self.dispatch(command) {
                            return LoopExit::Unexpected;
                        }
                    }
                    None => return LoopExit::Unexpected,
                }
            }
        })
    }
}
