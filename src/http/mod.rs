//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (inherited listener)
//!     → server.rs (Axum + axum-server, tracing, timeout, request ID)
//!     → routing::RouterService (fallback service)
//!     → context.rs (per-request Context: request + response sink)
//!     → middleware/ (global chain, then route chain)
//!     → handler.rs (terminal handler)
//!     → Send to client
//! ```

pub mod context;
pub mod handler;
pub mod middleware;
pub mod server;

pub use context::Context;
pub use handler::{handler_fn, Handler, NotFound};
pub use middleware::{
    access_log, bearer_auth, from_fn, from_handler, Middleware, MiddlewareChain, MiddlewareRef,
    Next,
};
pub use server::{build_app, HttpServer, X_REQUEST_ID};
