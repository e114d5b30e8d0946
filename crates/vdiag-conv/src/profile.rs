//! Vehicle profile - the per-vehicle parameter registry
//!
//! A profile is loaded once at startup, validated, and only read afterwards.
//! Parameters and scan ranges keep the order in which the document lists
//! them; group queries and discovery sweeps iterate in that order.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::definition::ParameterDefinition;
use crate::error::{is_hex, parse_address, ConvError, ConvResult};

/// Highest address a scan range may name (four hex digits)
pub const MAX_SCAN_ADDRESS: u32 = 0xFFFF;

/// Vehicle identification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub name: String,
    #[serde(default)]
    pub alias: String,
}

/// Group metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Address range to sweep on one control unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRange {
    /// Service codes to probe
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
    /// Inclusive `[low, high]` address bounds as four hex digits
    #[serde(default = "default_pid_range")]
    pub pid_range: [String; 2],
}

fn default_modes() -> Vec<String> {
    vec!["01".to_string()]
}

fn default_pid_range() -> [String; 2] {
    ["0100".to_string(), "01FF".to_string()]
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            pid_range: default_pid_range(),
        }
    }
}

impl ScanRange {
    /// Parsed inclusive address bounds
    ///
    /// `None` when a bound is not hex or does not fit in four hex digits.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        let low = parse_address(&self.pid_range[0])?;
        let high = parse_address(&self.pid_range[1])?;
        (high <= MAX_SCAN_ADDRESS).then_some((low, high))
    }

    fn validate(&self, header: &str) -> ConvResult<()> {
        let invalid = |reason: String| ConvError::Definition {
            pid: format!("scan_ranges.{}", header),
            reason,
        };

        let oversized = self
            .pid_range
            .iter()
            .any(|bound| parse_address(bound).is_some_and(|a| a > MAX_SCAN_ADDRESS));
        if oversized {
            return Err(invalid(format!(
                "pid_range {:?} exceeds {:04X}",
                self.pid_range, MAX_SCAN_ADDRESS
            )));
        }

        match self.bounds() {
            Some((low, high)) if low <= high => {}
            Some(_) => {
                return Err(invalid(format!(
                    "pid_range {:?} is not ordered",
                    self.pid_range
                )))
            }
            None => {
                return Err(invalid(format!(
                    "pid_range {:?} is not hex",
                    self.pid_range
                )))
            }
        }

        if let Some(mode) = self.modes.iter().find(|m| !is_hex(m)) {
            return Err(invalid(format!("mode '{}' is not hex", mode)));
        }

        Ok(())
    }
}

/// Complete vehicle profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub vehicle: VehicleInfo,
    #[serde(default)]
    pub groups: IndexMap<String, GroupInfo>,
    #[serde(default)]
    pub pids: IndexMap<String, ParameterDefinition>,
    #[serde(default)]
    pub scan_ranges: IndexMap<String, ScanRange>,
}

impl VehicleProfile {
    /// Load a profile from a JSON string
    pub fn from_json(json: &str) -> ConvResult<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a YAML string
    pub fn from_yaml(yaml: &str) -> ConvResult<Self> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a file, choosing the format by extension
    pub fn from_file(path: impl AsRef<Path>) -> ConvResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConvError::ProfileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let profile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => return Err(ConvError::UnsupportedFormat(path.to_path_buf())),
        };

        debug!(
            path = %path.display(),
            vehicle = %profile.vehicle.name,
            pids = profile.pids.len(),
            "Loaded vehicle profile"
        );
        Ok(profile)
    }

    /// Check every definition and scan range once, before any query
    pub fn validate(&self) -> ConvResult<()> {
        for (key, def) in &self.pids {
            def.validate(key)?;
        }
        for (header, range) in &self.scan_ranges {
            range.validate(header)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ParameterDefinition> {
        self.pids.get(key)
    }

    /// Registry keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pids.keys().map(String::as_str)
    }

    /// Definitions tagged with `tag`, in registry order
    pub fn in_group<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ParameterDefinition)> + 'a {
        self.pids
            .iter()
            .filter(move |(_, def)| def.in_group(tag))
            .map(|(key, def)| (key.as_str(), def))
    }

    pub fn group_info(&self, tag: &str) -> Option<&GroupInfo> {
        self.groups.get(tag)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }
}

/// Resolve `<dir>/<name>.json` (or `.yaml` / `.yml`) and load it
pub fn load_vehicle(dir: impl AsRef<Path>, name: &str) -> ConvResult<VehicleProfile> {
    let dir = dir.as_ref();
    let candidates: Vec<PathBuf> = ["json", "yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .collect();

    match candidates.iter().find(|p| p.exists()) {
        Some(path) => VehicleProfile::from_file(path),
        None => Err(ConvError::ProfileNotFound(candidates[0].clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROFILE: &str = r#"{
        "vehicle": {"name": "Test Car", "alias": "tc"},
        "groups": {
            "status": {"name": "Status", "description": "Basic vitals"}
        },
        "pids": {
            "rpm": {"mode": "01", "pid": "0C", "formula": "(A*256+B)/4", "group": ["status"]},
            "coolant": {"mode": "01", "pid": "05", "formula": "A-40", "group": ["status"]},
            "odo": {"mode": "22", "pid": "01A6", "formula": "unknown"}
        },
        "scan_ranges": {
            "7E0": {"modes": ["21"], "pid_range": ["2100", "21FF"]},
            "7C0": {}
        }
    }"#;

    #[test]
    fn test_from_json_preserves_order() {
        let profile = VehicleProfile::from_json(PROFILE).unwrap();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.keys().collect::<Vec<_>>(), vec!["rpm", "coolant", "odo"]);
        assert_eq!(
            profile.scan_ranges.keys().cloned().collect::<Vec<_>>(),
            vec!["7E0".to_string(), "7C0".to_string()]
        );
    }

    #[test]
    fn test_group_filter() {
        let profile = VehicleProfile::from_json(PROFILE).unwrap();
        let keys: Vec<&str> = profile.in_group("status").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rpm", "coolant"]);
        assert_eq!(profile.in_group("missing").count(), 0);
        assert_eq!(
            profile.group_info("status").and_then(|g| g.name.clone()),
            Some("Status".to_string())
        );
    }

    #[test]
    fn test_scan_range_defaults() {
        let profile = VehicleProfile::from_json(PROFILE).unwrap();
        let range = &profile.scan_ranges["7C0"];
        assert_eq!(range.modes, vec!["01".to_string()]);
        assert_eq!(range.bounds(), Some((0x0100, 0x01FF)));
    }

    #[test]
    fn test_invalid_formula_fails_load() {
        let json = r#"{
            "vehicle": {"name": "Bad"},
            "pids": {"x": {"mode": "01", "pid": "0C", "formula": "A.__class__"}}
        }"#;
        assert!(matches!(
            VehicleProfile::from_json(json),
            Err(ConvError::Formula { .. })
        ));
    }

    #[test]
    fn test_unordered_scan_range_fails_load() {
        let json = r#"{
            "vehicle": {"name": "Bad"},
            "scan_ranges": {"7E0": {"pid_range": ["21FF", "2100"]}}
        }"#;
        assert!(matches!(
            VehicleProfile::from_json(json),
            Err(ConvError::Definition { .. })
        ));
    }

    #[test]
    fn test_oversized_scan_range_fails_load() {
        let json = r#"{
            "vehicle": {"name": "Bad"},
            "scan_ranges": {"7E0": {"pid_range": ["2100", "1FFFF"]}}
        }"#;
        match VehicleProfile::from_json(json) {
            Err(ConvError::Definition { reason, .. }) => assert!(reason.contains("exceeds")),
            other => panic!("expected definition error, got {:?}", other),
        }

        let range = ScanRange {
            modes: vec!["21".into()],
            pid_range: ["2100".into(), "1FFFF".into()],
        };
        assert_eq!(range.bounds(), None);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
vehicle:
  name: Yaml Car
pids:
  speed:
    mode: "01"
    pid: "0D"
    formula: A
    unit: km/h
    confidence: standard
"#;
        let profile = VehicleProfile::from_yaml(yaml).unwrap();
        assert_eq!(profile.vehicle.alias, "");
        assert_eq!(profile.get("speed").map(|d| d.unit.as_str()), Some("km/h"));
    }

    #[test]
    fn test_load_vehicle_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test_car.json"), PROFILE).unwrap();

        let profile = load_vehicle(dir.path(), "test_car").unwrap();
        assert_eq!(profile.vehicle.name, "Test Car");

        match load_vehicle(dir.path(), "missing") {
            Err(ConvError::ProfileNotFound(path)) => {
                assert!(path.ends_with("missing.json"));
            }
            other => panic!("Expected ProfileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.ini");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            VehicleProfile::from_file(&path),
            Err(ConvError::UnsupportedFormat(_))
        ));
    }
}
