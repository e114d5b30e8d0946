//! Error types for definition loading and formula evaluation

use std::path::PathBuf;

use thiserror::Error;

use crate::expr::Var;

/// Errors that can occur while loading or validating parameter definitions
#[derive(Debug, Error)]
pub enum ConvError {
    /// A formula failed to parse into the restricted grammar
    #[error("invalid formula for '{pid}': {source}")]
    Formula {
        pid: String,
        #[source]
        source: EvalError,
    },

    /// Structurally invalid definition (bad hex, odd-length command, bad range)
    #[error("invalid definition for '{pid}': {reason}")]
    Definition { pid: String, reason: String },

    /// No profile file for the requested vehicle
    #[error("vehicle profile not found: {0}")]
    ProfileNotFound(PathBuf),

    /// Profile file with an extension we cannot parse
    #[error("unsupported profile format: {0}")]
    UnsupportedFormat(PathBuf),

    /// JSON error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for definition operations
pub type ConvResult<T> = Result<T, ConvError>;

/// Errors raised while parsing or evaluating a formula
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty formula")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },

    #[error("unexpected token '{token}' at position {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown name '{0}' (only A, B, C and D are allowed)")]
    UnknownName(String),

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("formula nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("variable {0} is not bound")]
    UnboundVariable(Var),

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("invalid power: {0}")]
    InvalidPower(String),
}

/// Result type for formula evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Check that a string is a non-empty run of hex digits
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a hex address code ("01A0", "0x01A0") into an integer
pub fn parse_address(s: &str) -> Option<u32> {
    let s = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(s, 16).ok()
}

/// Format an address as four uppercase hex digits
pub fn format_address(address: u32) -> String {
    format!("{:04X}", address)
}
