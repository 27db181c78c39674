// src/watch/stop.rs

//! One-shot stop signal shared by the supervisor, the change detectors and
//! in-flight reloads.

use std::sync::Arc;

use tokio::sync::watch;

/// Requests a stop. Cloning shares the same underlying flag.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clear a completed stop so the owner can run again.
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`StopHandle`].
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Resolve once a stop is requested.
    ///
    /// Returns `false` if every handle was dropped without requesting a
    /// stop, which callers treat as an abnormal exit.
    pub async fn stopped(&mut self) -> bool {
        self.rx.wait_for(|stopped| *stopped).await.is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }
}
