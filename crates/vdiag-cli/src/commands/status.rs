//! Status command - adapter state and basic vitals

use anyhow::Result;
use vdiag_obd::{Connection, VehicleProfile};

use crate::output::{OutputContext, ResultRow};

/// Show connection state, plus the status group when the car answers
pub async fn status(conn: &Connection, profile: &VehicleProfile, ctx: &OutputContext) -> Result<()> {
    let report = vdiag_obd::status(conn, profile).await?;

    let summary = [
        ("Vehicle", report.vehicle.clone()),
        ("Status", report.status.clone()),
        ("Port", report.port.clone()),
        ("Protocol", report.protocol.clone()),
    ];
    match &report.vitals {
        Some(vitals) => {
            let rows: Vec<ResultRow> = vitals.iter().map(ResultRow::from).collect();
            ctx.emit(&report, &summary, &rows);
        }
        None => ctx.emit_summary(&report, &summary),
    }
    Ok(())
}
