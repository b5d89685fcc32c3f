//! Resilience helpers.
//!
//! # Design Decisions
//! - Failed worker spawns are retried, never abandoned
//! - Retry delays grow exponentially with jitter so a broken binary does not
//!   turn the master into a fork loop

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
