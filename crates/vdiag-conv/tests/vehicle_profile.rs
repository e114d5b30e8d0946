//! Checks against the bundled vehicle profiles

use std::path::PathBuf;

use vdiag_conv::{
    decode, load_vehicle, ConfidenceTier, DecodedValue, Number, VehicleProfile,
};

fn vehicles_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../vehicles")
}

fn rav4() -> VehicleProfile {
    load_vehicle(vehicles_dir(), "rav4_xa50").expect("bundled profile loads")
}

#[test]
fn bundled_profile_loads_and_validates() {
    let profile = rav4();
    assert_eq!(profile.vehicle.alias, "rav4");
    assert!(!profile.is_empty());
    assert!(profile.validate().is_ok());
}

#[test]
fn every_definition_uses_a_read_only_service() {
    let read_only = ["01", "02", "03", "07", "09", "21", "22"];
    for (key, def) in &rav4().pids {
        assert!(
            read_only.contains(&def.mode.as_str()),
            "{} uses service {}",
            key,
            def.mode
        );
    }
}

#[test]
fn status_group_order_follows_document() {
    let profile = rav4();
    let keys: Vec<&str> = profile.in_group("status").map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec!["rpm", "speed", "coolant_temp", "battery_voltage", "fuel_level"]
    );
}

#[test]
fn wheel_speeds_share_one_response() {
    let profile = rav4();
    let raw = [0x62, 0x01, 0x03, 0x30, 0x31, 0x32, 0x33];
    let values: Vec<DecodedValue> = profile
        .in_group("wheels")
        .map(|(_, def)| decode(&raw, def))
        .collect();

    assert_eq!(
        values,
        vec![
            DecodedValue::Number(Number::Int(0x30)),
            DecodedValue::Number(Number::Int(0x31)),
            DecodedValue::Number(Number::Int(0x32)),
            DecodedValue::Number(Number::Int(0x33)),
        ]
    );
}

#[test]
fn extended_reads_use_two_byte_addresses() {
    // 0x61 and 0x62 replies echo two address bytes before the data
    for (key, def) in &rav4().pids {
        if def.mode == "21" || def.mode == "22" {
            assert_eq!(def.pid.len(), 4, "{} has pid {}", key, def.pid);
        }
    }
}

#[test]
fn confidence_tiers_are_counted() {
    let profile = rav4();
    let count = |tier| profile.pids.values().filter(|d| d.confidence == tier).count();
    let total = count(ConfidenceTier::Standard)
        + count(ConfidenceTier::Unverified)
        + count(ConfidenceTier::Speculative);
    assert_eq!(total, profile.len());
    assert!(count(ConfidenceTier::Standard) > 0);
}

#[test]
fn unknown_formula_reports_payload_hex() {
    let profile = rav4();
    let soc = profile.get("hybrid_soc").unwrap();
    let value = decode(&[0x62, 0x1F, 0x5B, 0x9C, 0x01], soc);
    assert_eq!(value, DecodedValue::Text("9c01".to_string()));
}
