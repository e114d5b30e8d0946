//! Transport layer for the diagnostic bus
//!
//! - ELM327 adapter on a serial port (USB or Bluetooth RFCOMM)
//! - Mock adapter for testing
//!
//! # Example
//!
//! ```ignore
//! use vdiag_obd::transport::{create_transport, TransportAdapter};
//! use vdiag_obd::config::TransportConfig;
//!
//! let config = TransportConfig::Mock(Default::default());
//! let transport = create_transport(&config).await?;
//! let response = transport.send_receive("7E0", &[0x01, 0x0C], Duration::from_secs(5)).await?;
//! ```

mod adapter;
pub mod elm327;
pub mod error;
pub mod mock;

pub use adapter::{ConnectionStatus, TransportAdapter};
pub use error::TransportError;

use std::sync::Arc;

use crate::config::TransportConfig;

/// Create a transport adapter based on configuration
pub async fn create_transport(
    config: &TransportConfig,
) -> Result<Arc<dyn TransportAdapter>, TransportError> {
    match config {
        TransportConfig::Elm327(cfg) => {
            let adapter = elm327::Elm327Adapter::connect(cfg).await?;
            Ok(Arc::new(adapter))
        }
        TransportConfig::Mock(cfg) => {
            let adapter = mock::MockTransportAdapter::new(cfg);
            Ok(Arc::new(adapter))
        }
    }
}
