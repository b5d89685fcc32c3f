//! Shutdown coordination inside the master.

use tokio::sync::watch;

/// One-way latch that long-running tasks can wait on.
///
/// Built on a watch channel, so tasks subscribing after the trigger still
/// observe it.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered.
    pub async fn wait(&mut self) {
        // Sender dropped without triggering also ends the wait.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
