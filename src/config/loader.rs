//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SeedConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SeedConfig, ConfigError> {
    let config: SeedConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SeedConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), SeedConfig::default());
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [listener.tls]
            cert_path = "cert.pem"
            key_path = "key.pem"

            [supervisor]
            drain_timeout_secs = 5

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.tls.unwrap().key_path, "key.pem");
        assert_eq!(config.supervisor.drain_timeout_secs, 5);
        assert_eq!(config.supervisor.reload_grace_ms, 500);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_semantic_errors() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("timeouts.request_secs"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:7070\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7070");

        assert!(matches!(
            load_config(Path::new("/nonexistent/seed.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
