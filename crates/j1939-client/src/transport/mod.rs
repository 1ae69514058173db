//! Transport layer
//!
//! This module provides the CAN transports the client can run over:
//! - In-memory virtual bus for development and testing
//! - SocketCAN for real interfaces (Linux only, `socketcan` feature)
//!
//! # Example
//!
//! ```ignore
//! use j1939_client::transport::{create_transport, CanTransport};
//! use j1939_client::ClientConfig;
//!
//! let transport = create_transport(&ClientConfig::new("vcan0", 0xFA));
//! transport.connect().await?;
//! ```

mod adapter;
pub mod error;
pub mod virtual_bus;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use adapter::CanTransport;
pub use error::TransportError;
pub use virtual_bus::{VirtualBus, VirtualTransport};

use std::sync::Arc;

use crate::config::{ClientConfig, TransportKind};

/// Create a transport for the configured (or interface-detected) kind.
///
/// Construction never fails; opening the underlying device happens in
/// `connect`. When a native transport is not available in this build,
/// the in-memory bus stands in so development hosts keep working.
pub fn create_transport(config: &ClientConfig) -> Arc<dyn CanTransport> {
    match config.transport_kind() {
        TransportKind::Virtual => Arc::new(VirtualTransport::new(&config.interface)),
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        TransportKind::SocketCan => Arc::new(socketcan::SocketCanTransport::new(&config.interface)),
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        TransportKind::SocketCan => {
            tracing::warn!(
                interface = %config.interface,
                "SocketCAN requires Linux and the 'socketcan' feature, using the in-memory bus"
            );
            Arc::new(VirtualTransport::new(&config.interface))
        }
    }
}
