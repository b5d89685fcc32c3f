//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SeedConfig (validated, immutable)
//!
//! In the master, on file change:
//!     watcher.rs detects change
//!     → loader.rs re-validates
//!     → reload request to the supervisor (same path as SIGUSR1)
//!     → new worker reads the file at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes take effect in new workers
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, SeedConfig, SupervisorConfig, TimeoutConfig,
    TlsConfig,
};
pub use validation::{validate_config, ValidationError};
