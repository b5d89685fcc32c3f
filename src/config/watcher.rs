//! Configuration file watcher for hot reload.
//!
//! A change that loads and validates becomes a reload request for the
//! supervisor; new workers read the file again when they start.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::lifecycle::signals::ControlSignal;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    control_tx: mpsc::UnboundedSender<ControlSignal>,
}

impl ConfigWatcher {
    /// Create a watcher that reports valid edits on `control_tx`.
    pub fn new(path: &Path, control_tx: mpsc::UnboundedSender<ControlSignal>) -> Self {
        Self {
            path: path.to_path_buf(),
            control_tx,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as events are
    /// wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.control_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_config(&path) {
                            Ok(_) => {
                                tracing::info!(path = ?path, "Config file changed, requesting reload");
                                let _ = tx.send(ControlSignal::Reload);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Ignoring invalid config change");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
