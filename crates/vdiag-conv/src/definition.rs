//! Parameter definition structures
//!
//! A definition describes how to request one data point from a control unit
//! and how to turn the response bytes into a physical value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{is_hex, ConvError, ConvResult};
use crate::expr;

/// Formula value that marks a definition whose decoding is not yet known
pub const FORMULA_SENTINEL: &str = "unknown";

/// Header used when a definition does not name one (engine ECU request id)
pub const DEFAULT_HEADER: &str = "7E0";

/// Trust level of a parameter definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    /// Documented, standardised parameter
    Standard,
    /// Observed to work on at least one vehicle but not confirmed
    #[default]
    Unverified,
    /// Guessed from community sources, may be wrong
    Speculative,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceTier::Standard => "standard",
            ConfidenceTier::Unverified => "unverified",
            ConfidenceTier::Speculative => "speculative",
        };
        f.write_str(s)
    }
}

/// Complete definition for a single parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Human-readable display name (defaults to the registry key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Service code, two hex digits in canonical form (e.g. "01", "21")
    pub mode: String,

    /// Address code within the service (e.g. "0C", "2101")
    pub pid: String,

    /// Target control unit header
    #[serde(default = "default_header")]
    pub header: String,

    /// Expected response length in bytes, 0 = unknown/variable
    #[serde(default)]
    pub bytes: usize,

    /// Formula over A, B, C, D; empty or "unknown" means raw passthrough
    #[serde(default)]
    pub formula: String,

    /// Unit string (e.g. "rpm", "°C", "kPa")
    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub confidence: ConfidenceTier,

    /// Group tags this parameter belongs to
    #[serde(default, rename = "group")]
    pub groups: Vec<String>,
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}

impl ParameterDefinition {
    /// Create a definition for a service/address pair with default header
    pub fn new(mode: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            name: None,
            mode: mode.into(),
            pid: pid.into(),
            header: default_header(),
            bytes: 0,
            formula: String::new(),
            unit: String::new(),
            confidence: ConfidenceTier::default(),
            groups: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = bytes;
        self
    }

    pub fn with_confidence(mut self, confidence: ConfidenceTier) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_group(mut self, tag: impl Into<String>) -> Self {
        self.groups.push(tag.into());
        self
    }

    /// Display name, falling back to the registry key
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    /// Service code and address code as one hex string ("010C")
    ///
    /// The service code is padded to two digits, so `1` + `0c` is `010C`.
    pub fn command_hex(&self) -> String {
        format!(
            "{:0>2}{}",
            self.mode.trim().to_ascii_uppercase(),
            self.pid.trim().to_ascii_uppercase()
        )
    }

    /// True if the response is reported as raw hex instead of evaluated
    pub fn is_passthrough(&self) -> bool {
        let formula = self.formula.trim();
        formula.is_empty() || formula.eq_ignore_ascii_case(FORMULA_SENTINEL)
    }

    pub fn in_group(&self, tag: &str) -> bool {
        self.groups.iter().any(|g| g == tag)
    }

    /// Structural validation performed once at load time.
    ///
    /// The service code is deliberately not checked against the read-only
    /// whitelist here; that happens on every dispatch.
    pub fn validate(&self, key: &str) -> ConvResult<()> {
        let invalid = |reason: String| ConvError::Definition {
            pid: key.to_string(),
            reason,
        };

        if !is_hex(&self.mode) {
            return Err(invalid(format!("mode '{}' is not hex", self.mode)));
        }
        if !is_hex(&self.pid) {
            return Err(invalid(format!("pid '{}' is not hex", self.pid)));
        }
        let command = self.command_hex();
        if command.len() % 2 != 0 {
            return Err(invalid(format!(
                "command '{}' has an odd number of hex digits",
                command
            )));
        }
        if !is_hex(&self.header) {
            return Err(invalid(format!("header '{}' is not hex", self.header)));
        }

        if !self.is_passthrough() {
            expr::parse(&self.formula).map_err(|source| ConvError::Formula {
                pid: key.to_string(),
                source,
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_deserialize_defaults() {
        let def: ParameterDefinition =
            serde_json::from_str(r#"{"mode": "01", "pid": "0C"}"#).unwrap();

        assert_eq!(def.header, "7E0");
        assert_eq!(def.bytes, 0);
        assert_eq!(def.formula, "");
        assert_eq!(def.confidence, ConfidenceTier::Unverified);
        assert!(def.groups.is_empty());
        assert_eq!(def.display_name("rpm"), "rpm");
        assert!(def.is_passthrough());
    }

    #[test]
    fn test_deserialize_full() {
        let def: ParameterDefinition = serde_json::from_str(
            r#"{
                "name": "Engine RPM",
                "mode": "01",
                "pid": "0C",
                "header": "7E0",
                "bytes": 4,
                "formula": "(A*256+B)/4",
                "unit": "rpm",
                "confidence": "standard",
                "group": ["status", "engine"]
            }"#,
        )
        .unwrap();

        assert_eq!(def.display_name("rpm"), "Engine RPM");
        assert_eq!(def.command_hex(), "010C");
        assert_eq!(def.confidence, ConfidenceTier::Standard);
        assert!(def.in_group("engine"));
        assert!(!def.in_group("tires"));
        assert!(!def.is_passthrough());
        assert!(def.validate("rpm").is_ok());
    }

    #[test]
    fn test_short_service_code_is_padded() {
        let def = ParameterDefinition::new("1", "0d");
        assert_eq!(def.command_hex(), "010D");
        assert!(def.validate("speed").is_ok());
    }

    #[test]
    fn test_unknown_confidence_rejected() {
        let result: Result<ParameterDefinition, _> =
            serde_json::from_str(r#"{"mode": "01", "pid": "0C", "confidence": "certain"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_sentinel_formula_is_passthrough() {
        let def = ParameterDefinition::new("21", "01").with_formula("UNKNOWN");
        assert!(def.is_passthrough());
        assert!(def.validate("x").is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_formula() {
        let def = ParameterDefinition::new("01", "0C").with_formula("abs(A)");
        match def.validate("rpm") {
            Err(ConvError::Formula { pid, source }) => {
                assert_eq!(pid, "rpm");
                assert_eq!(source, EvalError::UnknownName("abs".to_string()));
            }
            other => panic!("Expected Formula error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_odd_length_command() {
        let def = ParameterDefinition::new("01", "C");
        assert!(matches!(
            def.validate("odd"),
            Err(ConvError::Definition { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_hex() {
        assert!(ParameterDefinition::new("0G", "0C").validate("x").is_err());
        assert!(ParameterDefinition::new("01", "ZZ").validate("x").is_err());
        assert!(ParameterDefinition::new("01", "0C")
            .with_header("ECU")
            .validate("x")
            .is_err());
    }

    #[test]
    fn test_validate_does_not_check_whitelist() {
        // Write services are refused at dispatch, not at load
        let def = ParameterDefinition::new("2E", "F190");
        assert!(def.validate("write").is_ok());
    }
}
