//! Result documents returned by the query engine

use serde::Serialize;
use vdiag_conv::{ConfidenceTier, DecodedValue};

use crate::dtc::TroubleCode;

/// Local time in `2024-05-01T14:03:22+0200` form
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

/// Outcome of one parameter query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Ok,
    NoData,
    Error,
}

/// Result of querying one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub pid: String,
    pub name: String,
    pub mode: String,
    pub command: String,
    pub header: String,
    pub response_time_ms: u64,
    pub confidence: ConfidenceTier,
    pub status: QueryStatus,
    pub value: Option<DecodedValue>,
    pub unit: String,
    /// Hex of the response bytes
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Results for every parameter in one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub group: String,
    pub name: String,
    pub description: String,
    pub vehicle: String,
    pub alias: String,
    pub timestamp: String,
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DtcStatus {
    Ok,
    AllClear,
}

/// Stored and pending trouble codes
#[derive(Debug, Clone, Serialize)]
pub struct DtcReport {
    pub stored: Vec<TroubleCode>,
    pub pending: Vec<TroubleCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_error: Option<String>,
    pub status: DtcStatus,
    pub timestamp: String,
}

/// Result of an ad-hoc command
#[derive(Debug, Clone, Serialize)]
pub struct RawReport {
    pub command: String,
    pub header: String,
    pub response_time_ms: u64,
    pub raw_response: Option<String>,
    pub status: QueryStatus,
    pub timestamp: String,
}

/// One responding address found by a discovery sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanHit {
    pub header: String,
    pub mode: String,
    pub pid: String,
    pub command: String,
    pub raw_response: String,
}

/// Discovery sweep results
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan: &'static str,
    pub ecus_scanned: Vec<String>,
    pub pids_found: usize,
    pub timestamp: String,
    pub results: Vec<ScanHit>,
}

/// One configured parameter in a listing
#[derive(Debug, Clone, Serialize)]
pub struct PidEntry {
    pub pid: String,
    pub name: String,
    pub mode: String,
    pub command: String,
    pub header: String,
    pub unit: String,
    pub confidence: ConfidenceTier,
}

/// All configured parameters with counts per confidence tier
#[derive(Debug, Clone, Serialize)]
pub struct PidListing {
    pub vehicle: String,
    pub pid_count: usize,
    pub standard: usize,
    pub unverified: usize,
    pub speculative: usize,
    pub pids: Vec<PidEntry>,
}

/// Adapter and vehicle connection state
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub connected: bool,
    pub status: String,
    pub port: String,
    pub protocol: String,
    pub vehicle: String,
    pub alias: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vec<QueryResult>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vdiag_conv::Number;

    #[test]
    fn test_query_result_json() {
        let result = QueryResult {
            pid: "rpm".into(),
            name: "Engine RPM".into(),
            mode: "01".into(),
            command: "010C".into(),
            header: "7E0".into(),
            response_time_ms: 42,
            confidence: ConfidenceTier::Standard,
            status: QueryStatus::Ok,
            value: Some(DecodedValue::Number(Number::Float(1726.0))),
            unit: "rpm".into(),
            raw: Some("410c1af8".into()),
            error: None,
        };

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "pid": "rpm",
                "name": "Engine RPM",
                "mode": "01",
                "command": "010C",
                "header": "7E0",
                "response_time_ms": 42,
                "confidence": "standard",
                "status": "OK",
                "value": 1726.0,
                "unit": "rpm",
                "raw": "410c1af8"
            })
        );
    }

    #[test]
    fn test_status_names() {
        assert_eq!(serde_json::to_value(QueryStatus::NoData).unwrap(), json!("NO_DATA"));
        assert_eq!(serde_json::to_value(DtcStatus::AllClear).unwrap(), json!("ALL_CLEAR"));
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 24);
        assert_eq!(&ts[10..11], "T");
    }
}
