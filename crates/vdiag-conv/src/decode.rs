//! Decoding raw response bytes to values
//!
//! A positive response starts with an echo of the service (request + 0x40)
//! followed by an echo of the address, and the data bytes come after that.
//! The number of framing bytes depends on the leading byte:
//!
//! | leading byte  | framing bytes |
//! |---------------|---------------|
//! | `0x61`, `0x62`| 3 (service echo + 2-byte address) |
//! | `0x41..=0x49` | 2 (service echo + 1-byte address) |
//! | anything else | 2 |
//!
//! Decoding never fails. Evaluation errors are reported in-band as a
//! `FORMULA_ERROR: ...` string.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::definition::ParameterDefinition;
use crate::error::EvalError;
use crate::expr::{self, Bindings, Expr, Number};
use crate::precision::RESULT_PRECISION;

/// Prefix of the in-band error value
pub const FORMULA_ERROR_PREFIX: &str = "FORMULA_ERROR";

/// Number of framing bytes preceding the data for a given leading byte
pub fn frame_skip(leading: u8) -> usize {
    match leading {
        0x61 | 0x62 => 3,
        0x41..=0x49 => 2,
        _ => 2,
    }
}

/// Data bytes of a response with the framing stripped
pub fn payload(raw: &[u8]) -> &[u8] {
    let Some(&leading) = raw.first() else {
        return raw;
    };
    let skip = frame_skip(leading).min(raw.len());
    &raw[skip..]
}

/// A decoded value: a number from a formula or a text/hex string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Number(Number),
    Text(String),
}

impl DecodedValue {
    pub fn as_number(&self) -> Option<Number> {
        match self {
            DecodedValue::Number(n) => Some(*n),
            DecodedValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(s) => Some(s),
            DecodedValue::Number(_) => None,
        }
    }

    /// True for an in-band evaluation error
    pub fn is_formula_error(&self) -> bool {
        matches!(self, DecodedValue::Text(s) if s.starts_with(FORMULA_ERROR_PREFIX))
    }

    fn formula_error(err: &EvalError) -> Self {
        DecodedValue::Text(format!("{}: {}", FORMULA_ERROR_PREFIX, err))
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Number(n) => write!(f, "{}", n),
            DecodedValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<Number> for DecodedValue {
    fn from(n: Number) -> Self {
        DecodedValue::Number(n)
    }
}

/// Decoder bound to one definition or ad-hoc request
#[derive(Debug, Clone, PartialEq)]
pub enum Decoder {
    /// Evaluate a parsed formula over the payload bytes
    Formula(Expr),
    /// Formula did not parse; every response decodes to the error string
    Invalid(EvalError),
    /// Hex of the payload after framing
    Passthrough,
    /// Hex of the whole response, framing included (raw and scan requests)
    RawHex,
}

impl Decoder {
    /// Pick the decoder for a definition
    pub fn for_definition(def: &ParameterDefinition) -> Self {
        if def.is_passthrough() {
            return Decoder::Passthrough;
        }
        match expr::parse(&def.formula) {
            Ok(expr) => Decoder::Formula(expr),
            Err(e) => Decoder::Invalid(e),
        }
    }

    /// Decode a non-empty response
    pub fn decode(&self, raw: &[u8]) -> DecodedValue {
        match self {
            Decoder::RawHex => DecodedValue::Text(hex::encode(raw)),
            Decoder::Passthrough => DecodedValue::Text(hex::encode(payload(raw))),
            Decoder::Invalid(e) => DecodedValue::formula_error(e),
            Decoder::Formula(expr) => {
                let vars = Bindings::from_payload(payload(raw));
                trace!(?vars, "Evaluating formula");
                match expr.eval(&vars) {
                    Ok(n) => DecodedValue::Number(n.rounded(RESULT_PRECISION)),
                    Err(e) => DecodedValue::formula_error(&e),
                }
            }
        }
    }
}

/// Decode a raw response according to a definition
pub fn decode(raw: &[u8], def: &ParameterDefinition) -> DecodedValue {
    Decoder::for_definition(def).decode(raw)
}
