//! j1939-codec - SAE J1939 protocol codec
//!
//! Packs and parses 29-bit J1939 identifiers, decodes and encodes named
//! signals (SPNs) from fixed-layout parameter-group payloads, and converts
//! whole frames to and from decoded messages. Pure protocol arithmetic:
//! no I/O, no async, no transport assumptions.
//!
//! # Quick Start
//!
//! ```rust
//! use j1939_codec::{decode_frame, encode_frame, pgn, SpnMap, SpnValue};
//!
//! // Encode an EEC1 broadcast from engine #1
//! let mut spns = SpnMap::new();
//! spns.insert("engineSpeed".to_string(), SpnValue::Float(1800.0));
//! spns.insert("torque".to_string(), SpnValue::Integer(25));
//! let frame = encode_frame(pgn::EEC1, &spns, 0x00);
//!
//! // Decode it back
//! let msg = decode_frame(&frame);
//! assert_eq!(msg.pgn_name, "Electronic Engine Controller 1 (EEC1)");
//! assert_eq!(msg.spn("engineSpeed"), Some(&SpnValue::Float(1800.0)));
//! ```
//!
//! # Identifier arithmetic
//!
//! ```rust
//! use j1939_codec::{build_id, parse_id};
//!
//! // PDU1 (PF < 240): the PS field is a real destination address
//! let id = parse_id(build_id(0xEA00, 0xF9, 6, 0x00));
//! assert_eq!(id.destination_address, 0x00);
//!
//! // PDU2 (PF >= 240): inherently broadcast
//! let id = parse_id(build_id(0xF004, 0x00, 6, 0x17));
//! assert_eq!(id.destination_address, 0xFF);
//! ```

pub mod address;
pub mod id;
pub mod message;
pub mod pgn;
pub mod spn;
pub mod value;

pub use id::{build_id, parse_id, J1939Id, BROADCAST_ADDRESS, DEFAULT_PRIORITY};
pub use message::{decode_frame, encode_frame, encode_frame_to, J1939Message, RawFrame};
pub use spn::{decode_spns, encode_spns};
pub use value::{SpnMap, SpnValue};
