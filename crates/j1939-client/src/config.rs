//! Client configuration

use serde::{Deserialize, Serialize};

use j1939_codec::address;

use crate::error::ClientError;

/// Transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Process-local in-memory bus.
    Virtual,
    /// Native SocketCAN (Linux, `socketcan` feature).
    SocketCan,
}

/// Client configuration, immutable once the client is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// CAN interface name (e.g. "vcan0", "can0").
    pub interface: String,
    /// This node's source address (0x00-0xFD).
    pub source_address: u8,
    /// Transport kind; auto-detected from the interface name if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    /// Verbose per-frame logging in the dispatch path.
    #[serde(default)]
    pub debug: bool,
}

impl ClientConfig {
    /// Configuration with auto-detected transport and quiet logging.
    pub fn new(interface: impl Into<String>, source_address: u8) -> Self {
        Self {
            interface: interface.into(),
            source_address,
            transport: None,
            debug: false,
        }
    }

    /// Pin the transport kind instead of detecting it.
    pub fn with_transport(mut self, kind: TransportKind) -> Self {
        self.transport = Some(kind);
        self
    }

    /// Enable verbose per-frame logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Transport kind, configured or detected from the interface name.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport
            .unwrap_or_else(|| detect_kind(&self.interface))
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.source_address > address::MAX_NODE_ADDRESS {
            return Err(ClientError::InvalidSourceAddress(self.source_address));
        }
        Ok(())
    }
}

/// Detect the transport from an interface name.
///
/// `vcan*` selects the in-memory bus, `can*` selects native SocketCAN;
/// anything else falls back to the in-memory bus.
pub fn detect_kind(interface: &str) -> TransportKind {
    let iface = interface.to_ascii_lowercase();
    if iface.starts_with("vcan") {
        TransportKind::Virtual
    } else if iface.starts_with("can") {
        TransportKind::SocketCan
    } else {
        TransportKind::Virtual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_from_interface_name() {
        assert_eq!(detect_kind("vcan0"), TransportKind::Virtual);
        assert_eq!(detect_kind("can1"), TransportKind::SocketCan);
        assert_eq!(detect_kind("pcan_usb0"), TransportKind::Virtual);
    }

    #[test]
    fn test_explicit_kind_wins_over_detection() {
        let config = ClientConfig::new("can0", 0xFA).with_transport(TransportKind::Virtual);
        assert_eq!(config.transport_kind(), TransportKind::Virtual);
    }

    #[test]
    fn test_validate_source_address_range() {
        assert!(ClientConfig::new("vcan0", 0x00).validate().is_ok());
        assert!(ClientConfig::new("vcan0", 0xFD).validate().is_ok());
        assert!(matches!(
            ClientConfig::new("vcan0", 0xFE).validate(),
            Err(ClientError::InvalidSourceAddress(0xFE))
        ));
        assert!(matches!(
            ClientConfig::new("vcan0", 0xFF).validate(),
            Err(ClientError::InvalidSourceAddress(0xFF))
        ));
    }
}
