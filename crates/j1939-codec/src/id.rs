//! J1939 identifier packing and parsing
//!
//! A J1939 identifier is the 29-bit extended CAN ID split into priority,
//! PDU Format (PF), PDU Specific (PS), and source address fields. The PF
//! byte selects the addressing sub-format: below 240 the PS field carries
//! a destination address (PDU1), from 240 up the PS field is part of the
//! PGN itself and the traffic is inherently broadcast (PDU2).

use serde::{Deserialize, Serialize};

/// Default transmit priority for application traffic (lower is higher
/// bus priority).
pub const DEFAULT_PRIORITY: u8 = 6;

/// Global (broadcast) destination address.
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Parsed fields of a 29-bit J1939 identifier.
///
/// Bit layout: priority = bits 28-26, PF = bits 23-16, PS = bits 15-8,
/// source address = bits 7-0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct J1939Id {
    /// Priority, 0-7.
    pub priority: u8,
    /// Parameter Group Number.
    pub pgn: u32,
    /// Source address of the sender.
    pub source_address: u8,
    /// Destination address; 0xFF for broadcast and all PDU2 traffic.
    pub destination_address: u8,
    /// True for PDU1 (destination-specific) identifiers.
    pub is_pdu1: bool,
}

/// Parse a 29-bit extended CAN identifier into its J1939 fields.
///
/// Total over its input: every 29-bit value is syntactically valid.
/// Whether the PGN is a known parameter group is a separate concern of
/// the SPN table.
pub fn parse_id(can_id: u32) -> J1939Id {
    let priority = ((can_id >> 26) & 0x07) as u8;
    let pf = ((can_id >> 16) & 0xFF) as u8;
    let ps = ((can_id >> 8) & 0xFF) as u8;
    let source_address = (can_id & 0xFF) as u8;

    if pf < 240 {
        // PDU1: PS carries the destination, the PGN's low byte stays clear
        J1939Id {
            priority,
            pgn: u32::from(pf) << 8,
            source_address,
            destination_address: ps,
            is_pdu1: true,
        }
    } else {
        // PDU2: PS belongs to the PGN, always broadcast
        J1939Id {
            priority,
            pgn: (u32::from(pf) << 8) | u32::from(ps),
            source_address,
            destination_address: BROADCAST_ADDRESS,
            is_pdu1: false,
        }
    }
}

/// Build a 29-bit extended CAN identifier.
///
/// For PDU1 PGNs the PS field carries `destination_address`; for PDU2
/// PGNs the PS field comes from the PGN itself and the supplied
/// destination is ignored, so `parse_id(build_id(..))` reports 0xFF.
pub fn build_id(pgn: u32, source_address: u8, priority: u8, destination_address: u8) -> u32 {
    let pf = (pgn >> 8) & 0xFF;
    let ps = pgn & 0xFF;

    let mut can_id = u32::from(priority & 0x07) << 26;
    can_id |= pf << 16;
    can_id |= if pf < 240 {
        u32::from(destination_address) << 8
    } else {
        ps << 8
    };
    can_id | u32::from(source_address)
}
