//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Tag every line with the process role and pid
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, `RUST_LOG` wins when set

use tracing::Span;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::lifecycle::Mode;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
}

/// Span that identifies which process of the pair emitted a line.
pub fn process_span(mode: Mode) -> Span {
    tracing::info_span!("process", role = %mode, pid = std::process::id())
}
