//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Master and worker produce:
//!     → logging.rs (structured log events, role/pid span)
//!     → tower-http TraceLayer (per-request spans, worker only)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all request logs

pub mod logging;

pub use logging::{init_logging, process_span};
