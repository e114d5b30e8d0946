//! vdiag-conv - Parameter definitions and response decoding for vehicle diagnostics
//!
//! Turns raw diagnostic responses into physical values, driven by declarative
//! per-vehicle definitions instead of hard-coded decoders.
//!
//! # Features
//!
//! - **Sandboxed formulas** - `(A*256+B)/4` is parsed into a closed expression
//!   tree; calls, attributes and unknown names are rejected before evaluation
//! - **Service-aware framing** - echo bytes are stripped according to the
//!   leading response byte before A, B, C and D are bound
//! - **Never-failing decode** - evaluation errors come back as an in-band
//!   `FORMULA_ERROR: ...` value
//! - **JSON and YAML profiles** - validated once at load time, iterated in
//!   document order
//!
//! # Quick Start
//!
//! ```rust
//! use vdiag_conv::{decode, DecodedValue, Number, ParameterDefinition};
//!
//! let coolant = ParameterDefinition::new("01", "05")
//!     .with_name("Coolant Temperature")
//!     .with_formula("A-40")
//!     .with_unit("°C");
//!
//! // 41 05 84 -> 0x84 - 40 = 92
//! let value = decode(&[0x41, 0x05, 0x84], &coolant);
//! assert_eq!(value, DecodedValue::Number(Number::Int(92)));
//! ```
//!
//! # Profile Files
//!
//! ```json
//! {
//!   "vehicle": {"name": "Toyota RAV4 (XA50)", "alias": "rav4"},
//!   "groups": {"status": {"name": "Status", "description": "Basic vitals"}},
//!   "pids": {
//!     "rpm": {"mode": "01", "pid": "0C", "formula": "(A*256+B)/4",
//!             "unit": "rpm", "confidence": "standard", "group": ["status"]}
//!   },
//!   "scan_ranges": {"7E0": {"modes": ["21"], "pid_range": ["2100", "21FF"]}}
//! }
//! ```

pub mod decode;
pub mod definition;
pub mod error;
pub mod expr;
pub mod precision;
pub mod profile;

pub use decode::{decode, frame_skip, payload, DecodedValue, Decoder};
pub use definition::{ConfidenceTier, ParameterDefinition, DEFAULT_HEADER, FORMULA_SENTINEL};
pub use error::{format_address, is_hex, parse_address, ConvError, ConvResult, EvalError};
pub use expr::{evaluate, Bindings, Number, Var};
pub use precision::{round_result, RESULT_PRECISION};
pub use profile::{
    load_vehicle, GroupInfo, ScanRange, VehicleInfo, VehicleProfile, MAX_SCAN_ADDRESS,
};

/// Prelude for common imports
pub mod prelude {
    pub use crate::decode::{DecodedValue, Decoder};
    pub use crate::definition::{ConfidenceTier, ParameterDefinition};
    pub use crate::error::{ConvError, ConvResult};
    pub use crate::profile::VehicleProfile;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_to_value_workflow() {
        let profile = VehicleProfile::from_json(
            r#"{
                "vehicle": {"name": "Test"},
                "pids": {
                    "speed": {"mode": "01", "pid": "0D", "formula": "A", "unit": "km/h"},
                    "fuel": {"mode": "01", "pid": "2F", "formula": "A*100/255", "unit": "%"}
                }
            }"#,
        )
        .unwrap();

        let speed = profile.get("speed").unwrap();
        assert_eq!(
            decode(&[0x41, 0x0D, 0x32], speed),
            DecodedValue::Number(Number::Int(50))
        );

        let fuel = profile.get("fuel").unwrap();
        assert_eq!(
            decode(&[0x41, 0x2F, 0xFF], fuel),
            DecodedValue::Number(Number::Float(100.0))
        );
    }
}
