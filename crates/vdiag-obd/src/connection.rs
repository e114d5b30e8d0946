//! Connection to a vehicle through a transport adapter

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use vdiag_conv::DecodedValue;

use crate::command::RequestDescriptor;
use crate::config::TransportConfig;
use crate::error::{ObdError, ObdResult};
use crate::transport::{create_transport, ConnectionStatus, TransportAdapter, TransportError};

/// Reply to one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Response bytes as received (after length fitting)
    pub raw: Vec<u8>,
    /// Decoded value, `None` when the control unit did not answer
    pub value: Option<DecodedValue>,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// An open connection: adapter plus per-request timeout
pub struct Connection {
    adapter: Arc<dyn TransportAdapter>,
    timeout: Duration,
}

impl Connection {
    pub fn new(adapter: Arc<dyn TransportAdapter>, timeout: Duration) -> Self {
        Self { adapter, timeout }
    }

    /// Dispatch a request and decode the reply
    pub async fn query(&self, request: &RequestDescriptor) -> Result<Response, TransportError> {
        let mut raw = self
            .adapter
            .send_receive(request.header(), request.bytes(), self.timeout)
            .await?;

        if raw.is_empty() {
            debug!(
                header = request.header(),
                command = %request.command_hex(),
                "No data"
            );
            return Ok(Response::default());
        }

        let expected = request.expected_len();
        if expected > 0 && raw.len() != expected {
            warn!(
                command = %request.command_hex(),
                expected,
                received = raw.len(),
                "Response length differs from definition, fitting"
            );
            raw.resize(expected, 0);
        }

        let value = request.decode(&raw);
        debug!(
            header = request.header(),
            command = %request.command_hex(),
            raw = %hex::encode(&raw),
            %value,
            "Response"
        );
        Ok(Response {
            raw,
            value: Some(value),
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.adapter.status()
    }

    pub fn port_name(&self) -> String {
        self.adapter.port_name()
    }

    pub fn protocol_name(&self) -> String {
        self.adapter.protocol_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn close(&self) {
        self.adapter.close().await;
    }
}

/// Open the configured transport
///
/// Fails when no adapter answers.
pub async fn connect(config: &TransportConfig) -> ObdResult<Connection> {
    let adapter = create_transport(config).await?;
    if adapter.status() == ConnectionStatus::NotConnected {
        return Err(ObdError::Transport(TransportError::ConnectionFailed(
            "adapter not found or not responding".to_string(),
        )));
    }
    Ok(Connection::new(adapter, config.timeout()))
}
