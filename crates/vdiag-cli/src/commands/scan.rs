//! Scan command - discovery sweep over configured address ranges

use anyhow::Result;
use vdiag_obd::{Connection, VehicleProfile};

use crate::output::{OutputContext, ScanRow};

/// Probe the configured ranges and list the addresses that answer
pub async fn scan(
    conn: &Connection,
    profile: &VehicleProfile,
    ecu: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let report = vdiag_obd::scan(conn, profile, ecu).await?;

    let rows: Vec<ScanRow> = report
        .results
        .iter()
        .map(|hit| ScanRow {
            header: hit.header.clone(),
            mode: hit.mode.clone(),
            pid: hit.pid.clone(),
            response: hit.raw_response.clone(),
        })
        .collect();
    let summary = [
        ("ECUs", report.ecus_scanned.join(", ")),
        ("Found", report.pids_found.to_string()),
    ];
    ctx.emit(&report, &summary, &rows);
    Ok(())
}
