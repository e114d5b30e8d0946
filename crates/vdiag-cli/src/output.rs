//! Output formatting for vdiag (json, table)
//!
//! Result documents go to stdout; logs go to stderr.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use vdiag_obd::{DecodedValue, QueryResult, QueryStatus};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON document (default)
    #[default]
    Json,
    /// ASCII table format
    Table,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    /// Print a result document
    ///
    /// JSON prints the document itself; table prints the summary pairs and
    /// then one row per item.
    pub fn emit<D: Serialize, R: Tabled>(&self, doc: &D, summary: &[(&str, String)], rows: &[R]) {
        match self.format {
            OutputFormat::Json => print_json(doc),
            OutputFormat::Table => {
                for (key, value) in summary {
                    println!("{}: {}", key.bold(), value);
                }
                if rows.is_empty() {
                    println!("No data");
                } else {
                    if !summary.is_empty() {
                        println!();
                    }
                    println!("{}", Table::new(rows));
                }
            }
        }
    }

    /// Print a document that has no rows
    pub fn emit_summary<D: Serialize>(&self, doc: &D, summary: &[(&str, String)]) {
        match self.format {
            OutputFormat::Json => print_json(doc),
            OutputFormat::Table => {
                for (key, value) in summary {
                    println!("{}: {}", key.bold(), value);
                }
            }
        }
    }

    /// Print the fatal error document
    pub fn error(&self, msg: &str) {
        if self.format == OutputFormat::Table {
            eprintln!("{}", msg.red());
        }
        print_json(&ErrorDocument { error: msg });
    }
}

#[derive(Serialize)]
struct ErrorDocument<'a> {
    error: &'a str,
}

fn print_json<D: Serialize>(doc: &D) {
    match serde_json::to_string_pretty(doc) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"error": "failed to serialize result: {}"}}"#, e),
    }
}

/// Colored status label
pub fn status_label(status: QueryStatus) -> String {
    match status {
        QueryStatus::Ok => "OK".green().to_string(),
        QueryStatus::NoData => "NO_DATA".yellow().to_string(),
        QueryStatus::Error => "ERROR".red().to_string(),
    }
}

pub fn value_text(value: Option<&DecodedValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// One parameter result
#[derive(Debug, Tabled)]
pub struct ResultRow {
    #[tabled(rename = "PID")]
    pub pid: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Time (ms)")]
    pub time_ms: u64,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
}

impl From<&QueryResult> for ResultRow {
    fn from(r: &QueryResult) -> Self {
        Self {
            pid: r.pid.clone(),
            name: r.name.clone(),
            value: value_text(r.value.as_ref()),
            unit: r.unit.clone(),
            status: status_label(r.status),
            time_ms: r.response_time_ms,
            confidence: r.confidence.to_string(),
        }
    }
}

/// One trouble code
#[derive(Debug, Tabled)]
pub struct DtcRow {
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

/// One responding address from a discovery sweep
#[derive(Debug, Tabled)]
pub struct ScanRow {
    #[tabled(rename = "Header")]
    pub header: String,
    #[tabled(rename = "Mode")]
    pub mode: String,
    #[tabled(rename = "PID")]
    pub pid: String,
    #[tabled(rename = "Response")]
    pub response: String,
}

/// One configured parameter
#[derive(Debug, Tabled)]
pub struct PidRow {
    #[tabled(rename = "PID")]
    pub pid: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Command")]
    pub command: String,
    #[tabled(rename = "Header")]
    pub header: String,
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
}
