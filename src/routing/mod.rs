//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup):
//!     methods + path + handler + route middleware
//!     → method.rs (validate verbs, expand ANY)
//!     → router.rs (prefix + chain composition, groups)
//!     → trie.rs (one segment tree per method, conflict detection)
//!
//! Dispatch (per request):
//!     (method, path)
//!     → trie.rs (level-by-level segment expansion)
//!     → Route endpoint (precomposed chain + handler)
//!     → or not-found handler behind the global chain
//! ```
//!
//! # Design Decisions
//! - Registration errors surface at the call site, never at request time
//! - Route table is immutable once serving starts (no locks on the hot path)
//! - Paths are case-sensitive; repeated and trailing slashes are ignored
//! - Literal segments take precedence over `*` at the first point they differ

pub mod method;
pub mod route;
pub mod router;
pub mod trie;

use thiserror::Error;

pub use method::{parse_methods, METHOD_ANY, STANDARD_METHODS};
pub use route::Route;
pub use router::{Router, RouterGroup, RouterService, Routes};
pub use trie::RouteTrie;

/// Errors raised while building the route table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A route already occupies this method and path.
    #[error("conflict route method: {method} path: {path}")]
    Conflict { method: String, path: String },

    /// The method list contained an unknown verb.
    #[error("invalid route method: {method} path: {path}")]
    InvalidMethod { method: String, path: String },
}
