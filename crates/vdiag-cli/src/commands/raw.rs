//! Raw command - send an ad-hoc read request

use anyhow::Result;
use vdiag_obd::{query_raw, Connection};

use crate::output::{status_label, OutputContext};

/// Send a hex command to one header
pub async fn raw(conn: &Connection, command: &str, header: &str, ctx: &OutputContext) -> Result<()> {
    let report = query_raw(conn, command, header).await?;

    let summary = [
        ("Command", report.command.clone()),
        ("Header", report.header.clone()),
        ("Status", status_label(report.status)),
        (
            "Response",
            report.raw_response.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Time (ms)", report.response_time_ms.to_string()),
    ];
    ctx.emit_summary(&report, &summary);
    Ok(())
}
