//! Dtc command - stored and pending trouble codes

use anyhow::Result;
use vdiag_obd::{query_dtc, Connection, DtcStatus, TroubleCode};

use crate::output::{DtcRow, OutputContext};

/// Read stored and pending trouble codes
pub async fn dtc(conn: &Connection, ctx: &OutputContext) -> Result<()> {
    let report = query_dtc(conn).await?;

    let row = |kind: &str, code: &TroubleCode| DtcRow {
        code: code.code.clone(),
        kind: kind.to_string(),
        description: code.description.clone(),
    };
    let rows: Vec<DtcRow> = report
        .stored
        .iter()
        .map(|c| row("stored", c))
        .chain(report.pending.iter().map(|c| row("pending", c)))
        .collect();

    let label = match report.status {
        DtcStatus::Ok => "OK",
        DtcStatus::AllClear => "ALL_CLEAR",
    };
    let mut summary = vec![("Status", label.to_string())];
    if let Some(err) = &report.stored_error {
        summary.push(("Stored error", err.clone()));
    }
    if let Some(err) = &report.pending_error {
        summary.push(("Pending error", err.clone()));
    }
    ctx.emit(&report, &summary, &rows);
    Ok(())
}
