//! Transport configuration
//!
//! Selected by the `type` key of the `[transport]` table:
//!
//! ```toml
//! [transport]
//! type = "elm327"
//! port = "auto"
//! baud_rate = 38400
//! timeout_secs = 10
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port value that makes the adapter probe every serial port
pub const AUTO_PORT: &str = "auto";

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// ELM327-compatible adapter on a serial port
    Elm327(Elm327Config),
    /// Mock transport for testing
    Mock(MockConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Elm327(Elm327Config::default())
    }
}

impl TransportConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        match self {
            TransportConfig::Elm327(cfg) => Duration::from_secs(cfg.timeout_secs),
            TransportConfig::Mock(cfg) => Duration::from_secs(cfg.timeout_secs),
        }
    }
}

/// ELM327 serial adapter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elm327Config {
    /// Serial port path, or "auto" to probe all ports
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate; when unset the common adapter rates are tried in turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> String {
    AUTO_PORT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Elm327Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Elm327Config {
    pub fn is_auto(&self) -> bool {
        self.port.eq_ignore_ascii_case(AUTO_PORT)
    }
}

/// Mock transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    /// Simulated latency per request
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elm327_defaults() {
        let cfg: TransportConfig = serde_json::from_str(r#"{"type": "elm327"}"#).unwrap();
        match &cfg {
            TransportConfig::Elm327(elm) => {
                assert!(elm.is_auto());
                assert_eq!(elm.baud_rate, None);
            }
            other => panic!("Expected Elm327, got {:?}", other),
        }
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_mock_config() {
        let cfg: TransportConfig =
            serde_json::from_str(r#"{"type": "mock", "latency_ms": 5}"#).unwrap();
        assert_eq!(
            cfg,
            TransportConfig::Mock(MockConfig {
                latency_ms: 5,
                timeout_secs: 10
            })
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<TransportConfig, _> = serde_json::from_str(r#"{"type": "doip"}"#);
        assert!(result.is_err());
    }
}
