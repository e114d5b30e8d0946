//! Mock transport adapter for testing

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{ConnectionStatus, TransportAdapter, TransportError};
use crate::config::MockConfig;

/// Canned reply for one request
#[derive(Debug, Clone)]
enum MockReply {
    Data(Vec<u8>),
    Fail(TransportError),
}

#[derive(Debug, Clone)]
struct MockEntry {
    /// `None` matches any header
    header: Option<String>,
    request: Vec<u8>,
    reply: MockReply,
}

/// Mock transport adapter answering from a request table
///
/// Requests with no entry get an empty response, the same as a control unit
/// that stays silent.
pub struct MockTransportAdapter {
    config: MockConfig,
    status: RwLock<ConnectionStatus>,
    entries: RwLock<Vec<MockEntry>>,
    /// Every request seen, in order, as (header, bytes)
    sent: RwLock<Vec<(String, Vec<u8>)>>,
}

impl MockTransportAdapter {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            config: config.clone(),
            status: RwLock::new(ConnectionStatus::CarConnected),
            entries: RwLock::new(Self::default_entries()),
            sent: RwLock::new(Vec::new()),
        }
    }

    /// Mock with no canned responses at all
    pub fn empty() -> Self {
        let adapter = Self::new(&MockConfig::default());
        adapter.entries.write().clear();
        adapter
    }

    /// Add a response for a request sent to any header
    pub fn add_response(&self, request: Vec<u8>, response: Vec<u8>) {
        self.push(None, request, MockReply::Data(response));
    }

    /// Add a response for a request sent to one header
    pub fn add_header_response(&self, header: &str, request: Vec<u8>, response: Vec<u8>) {
        self.push(Some(header.to_string()), request, MockReply::Data(response));
    }

    /// Make a request fail with a transport error
    pub fn add_failure(&self, request: Vec<u8>, error: TransportError) {
        self.push(None, request, MockReply::Fail(error));
    }

    /// Make every request fail
    pub fn fail_all(&self, error: TransportError) {
        self.entries.write().clear();
        self.push(None, Vec::new(), MockReply::Fail(error));
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    /// Requests received so far, oldest first
    pub fn sent_requests(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.read().clone()
    }

    fn push(&self, header: Option<String>, request: Vec<u8>, reply: MockReply) {
        // Newest entry wins
        self.entries.write().insert(
            0,
            MockEntry {
                header,
                request,
                reply,
            },
        );
    }

    fn default_entries() -> Vec<MockEntry> {
        let any = |request: Vec<u8>, response: Vec<u8>| MockEntry {
            header: None,
            request,
            reply: MockReply::Data(response),
        };

        vec![
            // Supported PIDs 01-20
            any(vec![0x01, 0x00], vec![0x41, 0x00, 0xBE, 0x3F, 0xA8, 0x13]),
            // Calculated load: 0x40 -> 25.1 %
            any(vec![0x01, 0x04], vec![0x41, 0x04, 0x40]),
            // Coolant: 0x84 - 40 = 92 °C
            any(vec![0x01, 0x05], vec![0x41, 0x05, 0x84]),
            // Short term fuel trim: (0x82 - 128) * 100 / 128 = 1.56 %
            any(vec![0x01, 0x06], vec![0x41, 0x06, 0x82]),
            // Long term fuel trim
            any(vec![0x01, 0x07], vec![0x41, 0x07, 0x7E]),
            // RPM: 0x1AF8 / 4 = 1726
            any(vec![0x01, 0x0C], vec![0x41, 0x0C, 0x1A, 0xF8]),
            // Speed: 50 km/h
            any(vec![0x01, 0x0D], vec![0x41, 0x0D, 0x32]),
            // Intake air: 0x41 - 40 = 25 °C
            any(vec![0x01, 0x0F], vec![0x41, 0x0F, 0x41]),
            // Fuel level: 0x80 * 100 / 255 = 50.2 %
            any(vec![0x01, 0x2F], vec![0x41, 0x2F, 0x80]),
            // Module voltage: 0x36B0 / 1000 = 14.0 V
            any(vec![0x01, 0x42], vec![0x41, 0x42, 0x36, 0xB0]),
            // No stored codes (CAN count byte 0)
            any(vec![0x03], vec![0x43, 0x00]),
            // No pending codes
            any(vec![0x07], vec![0x47, 0x00]),
            // VIN
            any(vec![0x09, 0x02], {
                let mut resp = vec![0x49, 0x02, 0x01];
                resp.extend_from_slice(b"JTMW1RFV5KD000000");
                resp
            }),
        ]
    }

    fn find_reply(&self, header: &str, request: &[u8]) -> MockReply {
        let entries = self.entries.read();

        let header_matches =
            |entry: &MockEntry| entry.header.as_deref().map_or(true, |h| h == header);

        // Exact match first, then prefix match (the empty prefix catches everything)
        entries
            .iter()
            .find(|e| header_matches(e) && e.request == request)
            .or_else(|| {
                entries
                    .iter()
                    .find(|e| header_matches(e) && request.starts_with(&e.request))
            })
            .map(|e| e.reply.clone())
            .unwrap_or(MockReply::Data(Vec::new()))
    }
}

#[async_trait]
impl TransportAdapter for MockTransportAdapter {
    async fn send_receive(
        &self,
        header: &str,
        request: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.status().is_connected() {
            return Err(TransportError::ConnectionClosed);
        }

        self.sent.write().push((header.to_string(), request.to_vec()));

        // Simulate latency
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        debug!(header, request = %hex::encode(request), "Mock transport: request");
        match self.find_reply(header, request) {
            MockReply::Data(data) => Ok(data),
            MockReply::Fail(err) => Err(err),
        }
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    fn port_name(&self) -> String {
        "mock".to_string()
    }

    fn protocol_name(&self) -> String {
        if self.status() >= ConnectionStatus::ObdConnected {
            "ISO 15765-4 (CAN 11/500)".to_string()
        } else {
            "unknown".to_string()
        }
    }

    async fn close(&self) {
        self.set_status(ConnectionStatus::NotConnected);
    }
}
