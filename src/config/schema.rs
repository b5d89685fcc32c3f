//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML and every
//! field has a default, so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatcher and its supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Master/worker process supervision.
    pub supervisor: SupervisorConfig,

    /// Per-request timeouts.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS material; plain HTTP when absent.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS certificate paths, passed through to the worker unchanged.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Supervisor timing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// How long a stopping worker waits for in-flight requests.
    pub drain_timeout_secs: u64,

    /// Extra time past the drain deadline before a worker is killed.
    pub stop_timeout_secs: u64,

    /// Overlap between starting a new worker and retiring the old one on
    /// hot reload, in milliseconds.
    pub reload_grace_ms: u64,

    /// First retry delay after a failed spawn, in milliseconds.
    pub respawn_base_delay_ms: u64,

    /// Ceiling for the respawn retry delay, in milliseconds.
    pub respawn_max_delay_ms: u64,
}

impl SupervisorConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Drain deadline plus the kill margin.
    pub fn stop_deadline(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs + self.stop_timeout_secs)
    }

    pub fn reload_grace(&self) -> Duration {
        Duration::from_millis(self.reload_grace_ms)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
            stop_timeout_secs: 5,
            reload_grace_ms: 500,
            respawn_base_delay_ms: 100,
            respawn_max_delay_ms: 5000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Pretty for development, JSON for machine parsing.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
