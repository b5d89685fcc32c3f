//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered)
//! - Check that the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SeedConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SeedConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("supervisor.respawn_base_delay_ms ({base}) exceeds respawn_max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("observability.log_level {0:?} is not a valid filter")]
    LogLevel(String),
}

/// Check `config` for values serde accepts but the system cannot run with.
pub fn validate_config(config: &SeedConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    let supervisor = &config.supervisor;
    if supervisor.drain_timeout_secs == 0 {
        errors.push(ValidationError::Zero("supervisor.drain_timeout_secs"));
    }
    if supervisor.respawn_base_delay_ms == 0 {
        errors.push(ValidationError::Zero("supervisor.respawn_base_delay_ms"));
    }
    if supervisor.respawn_base_delay_ms > supervisor.respawn_max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: supervisor.respawn_base_delay_ms,
            max: supervisor.respawn_max_delay_ms,
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if tracing_subscriber::EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
