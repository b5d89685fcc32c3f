//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGUSR1)
//! - Translate signals to internal control events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Master: SIGTERM/SIGINT → shutdown, SIGUSR1 → hot reload
//! - Worker: SIGTERM/SIGINT → drain and exit

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Control events consumed by the master's monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Close the listener, stop workers and exit.
    Shutdown,
    /// Start a new worker and retire the current one.
    Reload,
}

/// Forward master-relevant OS signals into `tx` until the receiver is gone.
///
/// Handlers are installed before this returns, so a signal arriving right
/// after is not lost.
pub fn forward_os_signals(
    tx: mpsc::UnboundedSender<ControlSignal>,
) -> io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut reload = signal(SignalKind::user_defined1())?;

    Ok(tokio::spawn(async move {
        loop {
            let (event, name) = tokio::select! {
                Some(()) = interrupt.recv() => (ControlSignal::Shutdown, "SIGINT"),
                Some(()) = terminate.recv() => (ControlSignal::Shutdown, "SIGTERM"),
                Some(()) = reload.recv() => (ControlSignal::Reload, "SIGUSR1"),
                else => break,
            };
            tracing::info!(signal = name, event = ?event, "Signal received");
            if tx.send(event).is_err() {
                break;
            }
        }
    }))
}

/// Install the worker's stop handlers and return a future that resolves on
/// the first SIGINT or SIGTERM.
pub fn stop_requested() -> io::Result<impl std::future::Future<Output = ()> + Send + 'static> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::info!(signal = "SIGINT", "Stop requested"),
            _ = terminate.recv() => tracing::info!(signal = "SIGTERM", "Stop requested"),
        }
    })
}
