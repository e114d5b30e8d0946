//! Group and pid commands - read configured parameters

use anyhow::Result;
use vdiag_obd::{query_group, query_named, Connection, VehicleProfile};

use crate::output::{OutputContext, ResultRow};

/// Read every parameter in a group
pub async fn group(
    conn: &Connection,
    profile: &VehicleProfile,
    tag: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let report = query_group(conn, profile, tag).await?;

    let rows: Vec<ResultRow> = report.results.iter().map(ResultRow::from).collect();
    let summary = [
        ("Group", report.name.clone()),
        ("Vehicle", report.vehicle.clone()),
        ("Time", report.timestamp.clone()),
    ];
    ctx.emit(&report, &summary, &rows);
    Ok(())
}

/// Read one parameter
pub async fn pid(
    conn: &Connection,
    profile: &VehicleProfile,
    key: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let result = query_named(conn, profile, key).await?;
    ctx.emit(&result, &[], &[ResultRow::from(&result)]);
    Ok(())
}
