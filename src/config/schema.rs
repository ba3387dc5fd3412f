//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::Signal;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Log filter settings.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body decoded from JSON.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds allowed for in-flight requests once shutdown begins.
    pub grace_period_secs: u64,

    /// Signals that trigger shutdown.
    pub signals: Vec<Signal>,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
            signals: vec![Signal::Interrupt, Signal::Terminate],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "graceful_http=info,tower_http=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.shutdown.grace_period(), Duration::from_secs(10));
        assert_eq!(
            config.shutdown.signals,
            vec![Signal::Interrupt, Signal::Terminate]
        );
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [shutdown]
            signals = ["hup"]
            "#,
        )
        .unwrap();
        assert_eq!(config.shutdown.signals, vec![Signal::Hangup]);
        assert_eq!(config.shutdown.grace_period_secs, 10);
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [shutdown]
            signals = ["SIGKILL"]
            "#,
        );
        assert!(result.is_err());
    }
}
