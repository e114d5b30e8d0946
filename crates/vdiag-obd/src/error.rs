//! Query engine errors

use thiserror::Error;
use vdiag_conv::ConvError;

use crate::transport::TransportError;

/// Errors raised by the query engine
#[derive(Debug, Error)]
pub enum ObdError {
    /// Profile or configuration missing or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service code outside the read-only whitelist
    #[error("BLOCKED: Mode {mode} is not in read-only whitelist {allowed:?}")]
    Blocked {
        mode: String,
        allowed: Vec<&'static str>,
    },

    /// Malformed parameter definition
    #[error("Definition error for '{pid}': {reason}")]
    Definition { pid: String, reason: String },

    /// Transport error (adapter missing, bus silent)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Parameter key not in the profile
    #[error("Unknown PID '{name}'. Available: {available:?}")]
    UnknownParameter {
        name: String,
        available: Vec<String>,
    },

    /// Header not in the profile's scan ranges
    #[error("ECU header {header} not in scan_ranges. Available: {available:?}")]
    UnknownHeader {
        header: String,
        available: Vec<String>,
    },

    /// Raw command that is not a hex byte string
    #[error("Invalid command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
}

impl ObdError {
    /// True if the error must abort the whole invocation
    ///
    /// Everything else is confined to the one parameter or probe that
    /// raised it.
    pub fn is_fatal(&self) -> bool {
        match self {
            ObdError::Config(_)
            | ObdError::Blocked { .. }
            | ObdError::UnknownParameter { .. }
            | ObdError::UnknownHeader { .. }
            | ObdError::InvalidCommand { .. } => true,
            ObdError::Transport(TransportError::ConnectionFailed(_)) => true,
            ObdError::Transport(_) | ObdError::Definition { .. } => false,
        }
    }
}

impl From<ConvError> for ObdError {
    fn from(err: ConvError) -> Self {
        match err {
            ConvError::Definition { pid, reason } => ObdError::Definition { pid, reason },
            ConvError::Formula { pid, source } => ObdError::Definition {
                pid,
                reason: source.to_string(),
            },
            other => ObdError::Config(other.to_string()),
        }
    }
}

/// Result type for query engine operations
pub type ObdResult<T> = Result<T, ObdError>;
