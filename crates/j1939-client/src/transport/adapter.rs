//! Transport trait

use async_trait::async_trait;
use tokio::sync::broadcast;

use j1939_codec::RawFrame;

use super::TransportError;

/// Transport-agnostic interface to a CAN bus.
///
/// Frames crossing this boundary are plain values; transports copy them
/// and never retain references into caller buffers. Inbound frames are
/// delivered through a bounded broadcast channel: each subscriber gets
/// its own copy, and a subscriber that falls behind loses its oldest
/// frames instead of blocking the bus.
#[async_trait]
pub trait CanTransport: Send + Sync {
    /// Open the transport.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the transport. Closing an already-closed transport is a
    /// no-op.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Hand one frame to the bus. Returns once the frame has been
    /// queued; never waits for any reply.
    async fn send(&self, frame: RawFrame) -> Result<(), TransportError>;

    /// Subscribe to inbound frames.
    fn frames(&self) -> broadcast::Receiver<RawFrame>;

    /// Whether the transport is currently open.
    fn is_connected(&self) -> bool;
}
