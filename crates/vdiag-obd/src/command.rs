//! Request construction
//!
//! A [`RequestDescriptor`] carries everything needed to dispatch one request:
//! the bytes to send, the target header, the expected response length and
//! the decoder for the reply. Descriptors can only be created through
//! [`RequestDescriptor::build`] and [`RequestDescriptor::raw`], and both run
//! the safety gate before touching the request bytes.

use tracing::{trace, warn};
use vdiag_conv::{is_hex, DecodedValue, Decoder, ParameterDefinition, DEFAULT_HEADER};

use crate::error::{ObdError, ObdResult};
use crate::safety;

/// A ready-to-dispatch request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    name: String,
    bytes: Vec<u8>,
    header: String,
    expected_len: usize,
    decoder: Decoder,
}

impl RequestDescriptor {
    /// Build the request for a parameter definition
    ///
    /// Fails with `Blocked` for a non read-only service and with
    /// `Definition` when the service and address codes do not form whole
    /// hex bytes.
    pub fn build(name: &str, def: &ParameterDefinition) -> ObdResult<Self> {
        let mode = safety::authorize(&def.mode)?;
        let command = format!("{}{}", mode, def.pid.trim());

        let bytes = decode_command(&command).map_err(|reason| {
            warn!(pid = name, %command, %reason, "Refusing malformed command");
            ObdError::Definition {
                pid: name.to_string(),
                reason,
            }
        })?;

        trace!(pid = name, %command, header = %def.header, "Built request");
        Ok(Self {
            name: name.to_uppercase(),
            bytes,
            header: def.header.clone(),
            expected_len: def.bytes,
            decoder: Decoder::for_definition(def),
        })
    }

    /// Build an ad-hoc request from a hex command string
    ///
    /// The first two characters are the service code. The reply is reported
    /// as the hex of the whole response.
    pub fn raw(name: &str, command: &str, header: &str) -> ObdResult<Self> {
        let command = command.trim();
        let service: String = command.chars().take(2).collect();
        safety::authorize(&service)?;

        let bytes = decode_command(command).map_err(|reason| ObdError::InvalidCommand {
            command: command.to_string(),
            reason,
        })?;

        Ok(Self {
            name: name.to_string(),
            bytes,
            header: if header.is_empty() {
                DEFAULT_HEADER.to_string()
            } else {
                header.to_string()
            },
            expected_len: 0,
            decoder: Decoder::RawHex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Expected response length in bytes, 0 when unknown
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Hex text of the request bytes ("010C")
    pub fn command_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }

    /// Decode a response with the bound decoder
    pub fn decode(&self, raw: &[u8]) -> DecodedValue {
        self.decoder.decode(raw)
    }
}

fn decode_command(command: &str) -> Result<Vec<u8>, String> {
    if !is_hex(command) {
        return Err("not a hex string".to_string());
    }
    if command.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", command.len()));
    }
    hex::decode(command).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vdiag_conv::Number;

    #[test]
    fn test_build_standard_pid() {
        let def = ParameterDefinition::new("01", "0C")
            .with_formula("(A*256+B)/4")
            .with_bytes(4);
        let req = RequestDescriptor::build("rpm", &def).unwrap();

        assert_eq!(req.bytes(), &[0x01, 0x0C]);
        assert_eq!(req.header(), "7E0");
        assert_eq!(req.expected_len(), 4);
        assert_eq!(req.name(), "RPM");
        assert_eq!(req.command_hex(), "010C");
        assert_eq!(
            req.decode(&[0x41, 0x0C, 0x1A, 0xF8]),
            DecodedValue::Number(Number::Float(1726.0))
        );
    }

    #[test]
    fn test_build_extended_address() {
        let def = ParameterDefinition::new("22", "2101").with_header("750");
        let req = RequestDescriptor::build("tire", &def).unwrap();
        assert_eq!(req.bytes(), &[0x22, 0x21, 0x01]);
        assert_eq!(req.header(), "750");
    }

    #[test]
    fn test_build_normalizes_short_service() {
        let def = ParameterDefinition::new("1", "0D").with_formula("A");
        let req = RequestDescriptor::build("speed", &def).unwrap();
        assert_eq!(req.bytes(), &[0x01, 0x0D]);
    }

    #[test]
    fn test_build_blocks_before_encoding() {
        // Odd length and non-hex: the gate must answer first
        let def = ParameterDefinition::new("4", "Z");
        assert!(matches!(
            RequestDescriptor::build("clear", &def),
            Err(ObdError::Blocked { .. })
        ));
    }

    #[test]
    fn test_build_rejects_odd_length() {
        let def = ParameterDefinition::new("01", "C");
        assert!(matches!(
            RequestDescriptor::build("odd", &def),
            Err(ObdError::Definition { .. })
        ));
    }

    #[test]
    fn test_raw_command() {
        let req = RequestDescriptor::raw("RAW", "0902", "7DF").unwrap();
        assert_eq!(req.bytes(), &[0x09, 0x02]);
        assert_eq!(req.header(), "7DF");
        assert_eq!(req.decode(&[0x49, 0x02, 0x01]).as_text(), Some("490201"));
    }

    #[test]
    fn test_raw_default_header() {
        let req = RequestDescriptor::raw("RAW", "0100", "").unwrap();
        assert_eq!(req.header(), "7E0");
    }

    #[test]
    fn test_raw_blocked_and_invalid() {
        assert!(matches!(
            RequestDescriptor::raw("RAW", "04", "7E0"),
            Err(ObdError::Blocked { .. })
        ));
        assert!(matches!(
            RequestDescriptor::raw("RAW", "2E F190 00", "7E0"),
            Err(ObdError::Blocked { .. })
        ));
        assert!(matches!(
            RequestDescriptor::raw("RAW", "01 0C", "7E0"),
            Err(ObdError::InvalidCommand { .. })
        ));
        assert!(matches!(
            RequestDescriptor::raw("RAW", "010", "7E0"),
            Err(ObdError::InvalidCommand { .. })
        ));
    }
}
