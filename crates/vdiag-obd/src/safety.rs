//! Read-only service whitelist
//!
//! Every request passes through [`authorize`] before a single byte of it is
//! built. Services outside the whitelist include clearing trouble codes
//! (04), actuator tests (08), resets and memory writes; none of them may
//! ever reach the bus. There is no override.

use tracing::warn;

use crate::error::{ObdError, ObdResult};

/// Services that only read from the vehicle
///
/// | code | service |
/// |------|---------|
/// | 01 | current data |
/// | 02 | freeze frame data |
/// | 03 | stored trouble codes |
/// | 07 | pending trouble codes |
/// | 09 | vehicle information |
/// | 21 | manufacturer data by local identifier |
/// | 22 | data by identifier |
pub const ALLOWED_SERVICES: [&str; 7] = ["01", "02", "03", "07", "09", "21", "22"];

/// Canonical two-digit uppercase form of a service code ("1" -> "01")
pub fn normalize_service(code: &str) -> String {
    format!("{:0>2}", code.trim().to_ascii_uppercase())
}

/// Check a service code against the whitelist
///
/// Returns the normalized code on success.
pub fn authorize(code: &str) -> ObdResult<String> {
    let mode = normalize_service(code);
    if ALLOWED_SERVICES.contains(&mode.as_str()) {
        Ok(mode)
    } else {
        warn!(%mode, "Blocked non read-only service");
        Err(ObdError::Blocked {
            mode,
            allowed: ALLOWED_SERVICES.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_service("1"), "01");
        assert_eq!(normalize_service(" 9 "), "09");
        assert_eq!(normalize_service("2e"), "2E");
        assert_eq!(normalize_service("22"), "22");
    }

    #[test]
    fn test_whitelist_accepts_read_services() {
        for code in ALLOWED_SERVICES {
            assert_eq!(authorize(code).unwrap(), code);
        }
        assert_eq!(authorize("1").unwrap(), "01");
        assert_eq!(authorize("7").unwrap(), "07");
    }

    #[test]
    fn test_whitelist_blocks_everything_else() {
        for code in ["4", "04", "08", "0A", "10", "11", "14", "27", "2E", "2F", "31", "3B", "", "ZZ"] {
            match authorize(code) {
                Err(ObdError::Blocked { mode, .. }) => assert_eq!(mode, normalize_service(code)),
                other => panic!("{:?} should be blocked, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_every_byte_value() {
        let allowed = (0u8..=255)
            .filter(|b| authorize(&format!("{:02X}", b)).is_ok())
            .count();
        assert_eq!(allowed, ALLOWED_SERVICES.len());
    }
}
