//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Master:
//!     listener.rs (bind once, keep open across worker generations)
//!     → place_inherited (dup onto descriptor 3 in the child)
//!
//! Worker:
//!     listener.rs (inherit descriptor 3, verify TCP)
//!     → tls.rs (optional rustls acceptor)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - One bound socket for the lifetime of the master; workers come and go
//! - TLS is optional and handled transparently in the worker

pub mod listener;
pub mod tls;

pub use listener::{ListenerError, SharedListener, INHERITED_FD};
