//! List command - configured parameters, no connection needed

use anyhow::Result;
use vdiag_obd::{list_pids, VehicleProfile};

use crate::output::{OutputContext, PidRow};

/// List every parameter in the profile
pub fn list(profile: &VehicleProfile, ctx: &OutputContext) -> Result<()> {
    let listing = list_pids(profile);

    let rows: Vec<PidRow> = listing
        .pids
        .iter()
        .map(|p| PidRow {
            pid: p.pid.clone(),
            name: p.name.clone(),
            command: p.command.clone(),
            header: p.header.clone(),
            unit: p.unit.clone(),
            confidence: p.confidence.to_string(),
        })
        .collect();
    let summary = [
        ("Vehicle", listing.vehicle.clone()),
        (
            "PIDs",
            format!(
                "{} ({} standard, {} unverified, {} speculative)",
                listing.pid_count, listing.standard, listing.unverified, listing.speculative
            ),
        ),
    ];
    ctx.emit(&listing, &summary, &rows);
    Ok(())
}
