//! Query operations
//!
//! Every operation issues its requests one after another over a single
//! [`Connection`]; the bus is half-duplex and shared, so nothing here ever
//! runs two requests at once.
//!
//! Blocked services abort the whole operation. Anything else that goes
//! wrong with one parameter or probe is reported for that item only.

use std::time::Instant;

use tracing::{debug, info, warn};
use vdiag_conv::{
    format_address, ConfidenceTier, ParameterDefinition, VehicleProfile, DEFAULT_HEADER,
};

use crate::command::RequestDescriptor;
use crate::connection::Connection;
use crate::dtc::parse_dtc_response;
use crate::error::{ObdError, ObdResult};
use crate::report::{
    timestamp, DtcReport, DtcStatus, GroupReport, PidEntry, PidListing, QueryResult, QueryStatus,
    RawReport, ScanHit, ScanReport, StatusReport,
};
use crate::safety;
use crate::transport::ConnectionStatus;

/// Address increment between discovery probes
pub const SCAN_STRIDE: usize = 16;

/// Group queried for the vitals in a status report
pub const STATUS_GROUP: &str = "status";

/// Query one parameter
pub async fn query_pid(
    conn: &Connection,
    key: &str,
    def: &ParameterDefinition,
) -> ObdResult<QueryResult> {
    let mut result = QueryResult {
        pid: key.to_string(),
        name: def.display_name(key).to_string(),
        mode: def.mode.clone(),
        command: def.command_hex(),
        header: def.header.clone(),
        response_time_ms: 0,
        confidence: def.confidence,
        status: QueryStatus::NoData,
        value: None,
        unit: def.unit.clone(),
        raw: None,
        error: None,
    };

    let request = match RequestDescriptor::build(key, def) {
        Ok(request) => request,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            result.status = QueryStatus::Error;
            result.error = Some(e.to_string());
            return Ok(result);
        }
    };
    result.mode = safety::normalize_service(&def.mode);
    result.command = request.command_hex();

    let start = Instant::now();
    let response = conn.query(&request).await;
    result.response_time_ms = start.elapsed().as_millis() as u64;

    match response {
        Ok(resp) if !resp.is_empty() => {
            result.status = QueryStatus::Ok;
            result.raw = Some(hex::encode(&resp.raw));
            result.value = resp.value;
        }
        Ok(_) => {}
        Err(e) => {
            debug!(pid = key, error = %e, "Query failed");
            result.error = Some(e.to_string());
        }
    }

    Ok(result)
}

/// Query a parameter by its registry key
pub async fn query_named(
    conn: &Connection,
    profile: &VehicleProfile,
    key: &str,
) -> ObdResult<QueryResult> {
    let def = profile.get(key).ok_or_else(|| ObdError::UnknownParameter {
        name: key.to_string(),
        available: profile.keys().map(str::to_string).collect(),
    })?;
    query_pid(conn, key, def).await
}

/// Query every parameter tagged with `tag`, in registry order
pub async fn query_group(
    conn: &Connection,
    profile: &VehicleProfile,
    tag: &str,
) -> ObdResult<GroupReport> {
    let mut results = Vec::new();
    for (key, def) in profile.in_group(tag) {
        results.push(query_pid(conn, key, def).await?);
    }

    let info = profile.group_info(tag);
    if results.is_empty() && info.is_none() {
        warn!(group = tag, "Unknown group");
    }

    Ok(GroupReport {
        group: tag.to_string(),
        name: info
            .and_then(|g| g.name.clone())
            .unwrap_or_else(|| tag.to_string()),
        description: info.map(|g| g.description.clone()).unwrap_or_default(),
        vehicle: profile.vehicle.name.clone(),
        alias: profile.vehicle.alias.clone(),
        timestamp: timestamp(),
        results,
    })
}

/// Read stored (service 03) and pending (service 07) trouble codes
pub async fn query_dtc(conn: &Connection) -> ObdResult<DtcReport> {
    let stored = RequestDescriptor::raw("GET_DTC", "03", DEFAULT_HEADER)?;
    let pending = RequestDescriptor::raw("GET_PENDING_DTC", "07", DEFAULT_HEADER)?;

    let mut report = DtcReport {
        stored: Vec::new(),
        pending: Vec::new(),
        stored_error: None,
        pending_error: None,
        status: DtcStatus::Ok,
        timestamp: String::new(),
    };

    match conn.query(&stored).await {
        Ok(resp) if !resp.is_empty() => report.stored = parse_dtc_response(&resp.raw),
        Ok(_) => {}
        Err(e) => report.stored_error = Some(e.to_string()),
    }

    match conn.query(&pending).await {
        Ok(resp) if !resp.is_empty() => report.pending = parse_dtc_response(&resp.raw),
        Ok(_) => {}
        Err(e) => report.pending_error = Some(e.to_string()),
    }

    if report.stored.is_empty() && report.pending.is_empty() {
        report.status = DtcStatus::AllClear;
    }
    report.timestamp = timestamp();
    Ok(report)
}

/// Send an ad-hoc hex command
pub async fn query_raw(conn: &Connection, command: &str, header: &str) -> ObdResult<RawReport> {
    let request = RequestDescriptor::raw("RAW", command, header)?;

    let start = Instant::now();
    let response = conn.query(&request).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let raw_response = match response {
        Ok(resp) => resp.value.map(|v| v.to_string()),
        Err(e) => {
            debug!(command, error = %e, "Raw command failed");
            None
        }
    };

    Ok(RawReport {
        command: command.to_string(),
        header: request.header().to_string(),
        response_time_ms,
        status: if raw_response.is_some() {
            QueryStatus::Ok
        } else {
            QueryStatus::NoData
        },
        raw_response,
        timestamp: timestamp(),
    })
}

/// Sweep the configured address ranges and report which addresses answer
///
/// With `ecu` set only that header is swept. A probe that fails counts as
/// no response.
pub async fn scan(
    conn: &Connection,
    profile: &VehicleProfile,
    ecu: Option<&str>,
) -> ObdResult<ScanReport> {
    let targets: Vec<(&String, &vdiag_conv::ScanRange)> = match ecu {
        Some(header) => {
            let entry = profile
                .scan_ranges
                .get_key_value(header)
                .or_else(|| {
                    profile
                        .scan_ranges
                        .iter()
                        .find(|(h, _)| h.eq_ignore_ascii_case(header))
                })
                .ok_or_else(|| ObdError::UnknownHeader {
                    header: header.to_string(),
                    available: profile.scan_ranges.keys().cloned().collect(),
                })?;
            vec![entry]
        }
        None => profile.scan_ranges.iter().collect(),
    };

    let mut results = Vec::new();

    for (header, range) in &targets {
        let Some((low, high)) = range.bounds() else {
            warn!(%header, range = ?range.pid_range, "Skipping unreadable scan range");
            continue;
        };
        info!(
            %header,
            from = %format_address(low),
            to = %format_address(high),
            "Scanning ECU"
        );

        for mode in &range.modes {
            let mode = safety::authorize(mode)?;
            for address in (low..=high).step_by(SCAN_STRIDE) {
                let pid = format_address(address);
                let command = format!("{}{}", mode, pid);
                let name = format!("SCAN_{}_{}", header, command);

                let request = match RequestDescriptor::raw(&name, &command, header) {
                    Ok(request) => request,
                    Err(e) => {
                        debug!(%command, error = %e, "Skipping probe");
                        continue;
                    }
                };

                match conn.query(&request).await {
                    Ok(resp) => {
                        if let Some(value) = resp.value {
                            let raw_response = value.to_string();
                            info!(%header, %mode, %pid, %raw_response, "Found");
                            results.push(ScanHit {
                                header: header.to_string(),
                                mode: mode.clone(),
                                pid,
                                command,
                                raw_response,
                            });
                        }
                    }
                    Err(e) => debug!(%command, error = %e, "Probe failed"),
                }
            }
        }
    }

    Ok(ScanReport {
        scan: "discovery",
        ecus_scanned: targets.iter().map(|(h, _)| h.to_string()).collect(),
        pids_found: results.len(),
        timestamp: timestamp(),
        results,
    })
}

/// List every configured parameter; needs no connection
pub fn list_pids(profile: &VehicleProfile) -> PidListing {
    let pids: Vec<PidEntry> = profile
        .pids
        .iter()
        .map(|(key, def)| PidEntry {
            pid: key.clone(),
            name: def.display_name(key).to_string(),
            mode: def.mode.clone(),
            command: def.command_hex(),
            header: def.header.clone(),
            unit: def.unit.clone(),
            confidence: def.confidence,
        })
        .collect();

    let count = |tier: ConfidenceTier| pids.iter().filter(|p| p.confidence == tier).count();

    PidListing {
        vehicle: profile.vehicle.name.clone(),
        pid_count: pids.len(),
        standard: count(ConfidenceTier::Standard),
        unverified: count(ConfidenceTier::Unverified),
        speculative: count(ConfidenceTier::Speculative),
        pids,
    }
}

/// Adapter state, plus the status group when the car answers
pub async fn status(conn: &Connection, profile: &VehicleProfile) -> ObdResult<StatusReport> {
    let link = conn.status();

    let vitals = if link == ConnectionStatus::CarConnected {
        Some(query_group(conn, profile, STATUS_GROUP).await?.results)
    } else {
        None
    };

    Ok(StatusReport {
        connected: link.is_connected(),
        status: link.to_string(),
        port: conn.port_name(),
        protocol: conn.protocol_name(),
        vehicle: profile.vehicle.name.clone(),
        alias: profile.vehicle.alias.clone(),
        timestamp: timestamp(),
        vitals,
    })
}
