//! vdiag-obd - Read-only OBD-II query engine
//!
//! Sends requests built from vehicle profile definitions to control units
//! and decodes the replies. Only read services ever reach the bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    engine (query ops)                     │
//! │  query_pid · query_group · query_dtc · query_raw · scan  │
//! │                           │                              │
//! │              ┌────────────┴────────────┐                 │
//! │              │   RequestDescriptor     │                 │
//! │              │ safety::authorize first │                 │
//! │              └────────────┬────────────┘                 │
//! │                           │                              │
//! │                     ┌─────┴─────┐                        │
//! │                     │Connection │  one request at a time │
//! │                     └─────┬─────┘                        │
//! │                           │                              │
//! │                 ┌─────────┴────────┐                     │
//! │                 │ TransportAdapter │                     │
//! │                 │ (ELM327 / mock)  │                     │
//! │                 └──────────────────┘                     │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod connection;
pub mod dtc;
pub mod engine;
pub mod error;
pub mod report;
pub mod safety;
pub mod transport;

pub use command::RequestDescriptor;
pub use config::{Elm327Config, MockConfig, TransportConfig};
pub use connection::{connect, Connection, Response};
pub use dtc::TroubleCode;
pub use engine::{
    list_pids, query_dtc, query_group, query_named, query_pid, query_raw, scan, status,
};
pub use error::{ObdError, ObdResult};
pub use report::{
    DtcReport, DtcStatus, GroupReport, PidEntry, PidListing, QueryResult, QueryStatus, RawReport,
    ScanHit, ScanReport, StatusReport,
};
pub use safety::{authorize, normalize_service, ALLOWED_SERVICES};
pub use transport::{create_transport, ConnectionStatus, TransportAdapter, TransportError};

// Re-export for convenience
pub use vdiag_conv::{ConfidenceTier, DecodedValue, ParameterDefinition, VehicleProfile};
