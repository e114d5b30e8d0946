//! Transport adapter trait and types

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::TransportError;

/// How far the link to the vehicle has come up
///
/// Ordered: each state implies every state before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConnectionStatus {
    /// No adapter found or it stopped responding
    NotConnected,
    /// Adapter answers but no vehicle protocol was negotiated
    ElmConnected,
    /// Protocol negotiated, ignition off
    ObdConnected,
    /// Vehicle answered a service 01 request
    CarConnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self != ConnectionStatus::NotConnected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::NotConnected => "Not Connected",
            ConnectionStatus::ElmConnected => "ELM Connected",
            ConnectionStatus::ObdConnected => "OBD Connected",
            ConnectionStatus::CarConnected => "Car Connected",
        };
        f.write_str(s)
    }
}

/// Transport-agnostic interface to a diagnostic bus
///
/// Exactly one request is outstanding at a time; callers await each
/// `send_receive` before issuing the next.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Send a request to the control unit at `header` and wait for its response
    ///
    /// # Returns
    /// The response bytes (service echo included), or an empty vector when
    /// the control unit did not answer.
    async fn send_receive(
        &self,
        header: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Current link state
    fn status(&self) -> ConnectionStatus;

    /// Name of the underlying port ("/dev/ttyUSB0", "mock")
    fn port_name(&self) -> String;

    /// Negotiated bus protocol, "unknown" before negotiation
    fn protocol_name(&self) -> String;

    /// Release the port; later requests fail with `ConnectionClosed`
    async fn close(&self);
}
