//! Trouble codes from services 03 (stored) and 07 (pending)
//!
//! Each code is two bytes. The top two bits select the system letter, the
//! next two bits are the first digit and the remaining twelve bits are
//! three hex digits: `0x01 0x33` is `P0133`.

use serde::Serialize;

/// System letter from the top two bits of the first code byte
pub fn category_prefix(high: u8) -> char {
    match (high >> 6) & 0x03 {
        0 => 'P',
        1 => 'C',
        2 => 'B',
        _ => 'U',
    }
}

/// A trouble code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TroubleCode {
    /// Code text, e.g. "P0133"
    pub code: String,
    /// Description, empty when not known
    pub description: String,
}

impl TroubleCode {
    pub fn from_bytes(high: u8, low: u8) -> Self {
        let code = format!(
            "{}{:01X}{:01X}{:02X}",
            category_prefix(high),
            (high >> 4) & 0x03,
            high & 0x0F,
            low
        );
        Self {
            description: describe(&code).to_string(),
            code,
        }
    }
}

/// Generic descriptions for a few common codes
fn describe(code: &str) -> &'static str {
    match code {
        "P0100" => "Mass or Volume Air Flow Circuit Malfunction",
        "P0133" => "O2 Sensor Circuit Slow Response (Bank 1 Sensor 1)",
        "P0171" => "System Too Lean (Bank 1)",
        "P0172" => "System Too Rich (Bank 1)",
        "P0300" => "Random/Multiple Cylinder Misfire Detected",
        "P0420" => "Catalyst System Efficiency Below Threshold (Bank 1)",
        "P0441" => "Evaporative Emission Control System Incorrect Purge Flow",
        "P0455" => "Evaporative Emission Control System Leak Detected (large leak)",
        "U0100" => "Lost Communication With ECM/PCM",
        _ => "",
    }
}

/// Parse a service 03/07 response (service echo included)
///
/// On CAN the echo is followed by a count byte, which shows up as an odd
/// number of remaining bytes and is dropped. `0000` entries are padding.
pub fn parse_dtc_response(raw: &[u8]) -> Vec<TroubleCode> {
    let Some((_, mut data)) = raw.split_first() else {
        return Vec::new();
    };
    if data.len() % 2 == 1 {
        data = &data[1..];
    }

    data.chunks_exact(2)
        .filter(|pair| pair[..] != [0x00, 0x00])
        .map(|pair| TroubleCode::from_bytes(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_letters() {
        assert_eq!(TroubleCode::from_bytes(0x01, 0x33).code, "P0133");
        assert_eq!(TroubleCode::from_bytes(0x44, 0x20).code, "C0420");
        assert_eq!(TroubleCode::from_bytes(0x92, 0x34).code, "B1234");
        assert_eq!(TroubleCode::from_bytes(0xC1, 0x00).code, "U0100");
        assert_eq!(TroubleCode::from_bytes(0x3F, 0xFF).code, "P3FFF");
    }

    #[test]
    fn test_known_description() {
        let dtc = TroubleCode::from_bytes(0x04, 0x20);
        assert_eq!(dtc.code, "P0420");
        assert!(dtc.description.starts_with("Catalyst"));
        assert_eq!(TroubleCode::from_bytes(0x12, 0x34).description, "");
    }

    #[test]
    fn test_parse_can_with_count() {
        // 43, count 2, P0133, P0420
        let codes = parse_dtc_response(&[0x43, 0x02, 0x01, 0x33, 0x04, 0x20]);
        let names: Vec<&str> = codes.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(names, vec!["P0133", "P0420"]);
    }

    #[test]
    fn test_parse_legacy_with_padding() {
        // Non-CAN frames are padded to three codes
        let codes = parse_dtc_response(&[0x43, 0x01, 0x71, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].code, "P0171");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_dtc_response(&[]).is_empty());
        assert!(parse_dtc_response(&[0x43, 0x00]).is_empty());
        assert!(parse_dtc_response(&[0x47]).is_empty());
    }
}
