//! Frame-level message codec
//!
//! Composes the identifier codec and the SPN table: a raw frame in, a
//! decoded message out, and back again. Decoding cannot fail - malformed
//! payloads degrade to a partial signal map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::id::{build_id, parse_id, BROADCAST_ADDRESS, DEFAULT_PRIORITY};
use crate::pgn;
use crate::spn::{decode_spns, encode_spns};
use crate::value::{SpnMap, SpnValue};

/// A raw CAN frame crossing the transport boundary.
///
/// Always the 29-bit extended form. Frames are plain values: transports
/// copy them, never alias them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// 29-bit extended identifier.
    pub id: u32,
    /// Payload, 0-8 bytes.
    pub data: Vec<u8>,
    /// Receipt/send time, if the transport stamped one.
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawFrame {
    pub fn new(id: u32, data: Vec<u8>) -> Self {
        Self {
            id,
            data,
            timestamp: Some(Utc::now()),
        }
    }
}

/// A decoded J1939 message, as handed to subscribers.
///
/// Immutable after creation; handlers must not assume it outlives their
/// own invocation.
#[derive(Debug, Clone, Serialize)]
pub struct J1939Message {
    /// Parameter Group Number.
    pub pgn: u32,
    /// Display name from the static PGN table.
    pub pgn_name: String,
    /// Source address of the sender.
    pub source_address: u8,
    /// Destination address; 0xFF for broadcast.
    pub destination_address: u8,
    /// Priority, 0-7.
    pub priority: u8,
    /// Decoded signals, keyed by name.
    pub spns: SpnMap,
    /// Original payload, retained for audit only.
    #[serde(serialize_with = "hex_bytes")]
    pub raw: Vec<u8>,
    /// When the frame was received.
    pub timestamp: DateTime<Utc>,
}

impl J1939Message {
    /// Look up a decoded signal by name.
    pub fn spn(&self, name: &str) -> Option<&SpnValue> {
        self.spns.get(name)
    }
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Decode a raw frame into a message.
///
/// Total over its input; stamps with the frame's timestamp, or now if
/// the transport did not provide one.
pub fn decode_frame(frame: &RawFrame) -> J1939Message {
    let id = parse_id(frame.id);

    J1939Message {
        pgn: id.pgn,
        pgn_name: pgn::name(id.pgn),
        source_address: id.source_address,
        destination_address: id.destination_address,
        priority: id.priority,
        spns: decode_spns(id.pgn, &frame.data),
        raw: frame.data.clone(),
        timestamp: frame.timestamp.unwrap_or_else(Utc::now),
    }
}

/// Encode signals into a broadcast frame with the default priority.
pub fn encode_frame(group: u32, spns: &SpnMap, source_address: u8) -> RawFrame {
    encode_frame_to(group, spns, source_address, DEFAULT_PRIORITY, BROADCAST_ADDRESS)
}

/// Encode signals into a frame with explicit priority and destination.
///
/// Deterministic given its inputs, apart from the send timestamp.
pub fn encode_frame_to(
    group: u32,
    spns: &SpnMap,
    source_address: u8,
    priority: u8,
    destination_address: u8,
) -> RawFrame {
    RawFrame {
        id: build_id(group, source_address, priority, destination_address),
        data: encode_spns(group, spns),
        timestamp: Some(Utc::now()),
    }
}
