//! Process lifecycle: roles, supervision and signals.
//!
//! # Data Flow
//! ```text
//! Master (mode.rs → supervisor.rs):
//!     Bind once → launcher.rs (re-exec with descriptor 3) → monitor loop
//!     SIGUSR1 / config change → spawn new worker → retire old after grace
//!     Worker exit → respawn (backoff for crash loops)
//!     SIGTERM/SIGINT → close listener → stop workers → exit
//!
//! Worker (worker.rs):
//!     Inherit descriptor 3 → serve → SIGTERM/SIGINT → drain → exit
//! ```
//!
//! # Design Decisions
//! - Role is fixed per process and read from the environment once
//! - All worker handles are owned by the single monitor loop
//! - Shutdown has a deadline: workers are killed after drain + stop timeout

pub mod launcher;
pub mod mode;
pub mod shutdown;
pub mod signals;
pub mod supervisor;
pub mod worker;

pub use launcher::{ExecLauncher, WorkerHandle, WorkerLauncher};
pub use mode::Mode;
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::ControlSignal;
pub use supervisor::{Supervisor, SupervisorState};
pub use worker::serve_inherited;

use thiserror::Error;

use crate::net::ListenerError;

/// Error type for master and worker startup.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Binding or inheriting the listening socket failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The first worker could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    /// TLS material could not be loaded.
    #[error("failed to load TLS configuration: {0}")]
    Tls(#[source] std::io::Error),

    /// The HTTP server failed while serving.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
