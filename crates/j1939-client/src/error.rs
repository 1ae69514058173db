//! Error types for J1939 client operations

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for J1939 client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by [`J1939Client`](crate::J1939Client).
///
/// Short or malformed payloads are not errors anywhere in this crate:
/// decoding degrades to a partial signal map. Handler failures are caught
/// and logged at the dispatch boundary and never reach the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Source address outside the legal node range at construction.
    /// 0xFE is the null address and 0xFF is broadcast.
    #[error("invalid source address 0x{0:02X}: node identities are 0x00-0xFD")]
    InvalidSourceAddress(u8),

    /// `connect()` while a connection is already live.
    #[error("already connected")]
    AlreadyConnected,

    /// A send or request without a live connection.
    #[error("not connected")]
    NotConnected,

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
