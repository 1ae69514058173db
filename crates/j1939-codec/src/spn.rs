//! Per-PGN signal decode and encode
//!
//! Fixed-layout little-endian payloads, 8 bytes unless the group says
//! otherwise, with 0xFF marking "not available". Decode is total: fields
//! whose bytes are missing from a short payload are omitted, unknown PGNs
//! yield an empty map, and nothing here returns an error.

use tracing::debug;

use crate::pgn;
use crate::value::{SpnMap, SpnValue};

/// Decode the named signals of `group` out of a raw payload.
pub fn decode_spns(group: u32, data: &[u8]) -> SpnMap {
    let mut spns = SpnMap::new();

    if pgn::is_well_known(group) && data.len() < pgn::payload_len(group) {
        debug!(
            pgn = format_args!("0x{:04X}", group),
            len = data.len(),
            "short payload, decoding available fields only"
        );
    }

    match group {
        pgn::EEC1 => {
            if data.len() >= 5 {
                let raw = u16::from_le_bytes([data[3], data[4]]);
                spns.insert(
                    "engineSpeed".to_string(),
                    SpnValue::Float(f64::from(raw) * 0.125),
                );
            }
            if data.len() >= 3 {
                spns.insert(
                    "torque".to_string(),
                    SpnValue::Integer(i64::from(data[2]) - 125),
                );
            }
        }
        pgn::ET1 => {
            if !data.is_empty() {
                spns.insert(
                    "coolantTemp".to_string(),
                    SpnValue::Integer(i64::from(data[0]) - 40),
                );
            }
        }
        pgn::ETC1 | pgn::PROP_TRANS_STATUS => {
            if data.len() >= 2 {
                let raw = u16::from_le_bytes([data[0], data[1]]);
                spns.insert(
                    "outputShaftSpeed".to_string(),
                    SpnValue::Float(f64::from(raw) * 0.125),
                );
            }
            if data.len() >= 5 {
                spns.insert("gear".to_string(), SpnValue::Integer(i64::from(data[4])));
            }
        }
        pgn::REQUEST => {
            if data.len() >= 3 {
                let requested =
                    u32::from(data[0]) | u32::from(data[1]) << 8 | u32::from(data[2]) << 16;
                spns.insert(
                    "requestedPGN".to_string(),
                    SpnValue::Text(format!("0x{:04X}", requested)),
                );
            }
        }
        pgn::ENGINE_CONTROL_CMD => {
            if data.len() >= 2 {
                let raw = u16::from_le_bytes([data[0], data[1]]);
                spns.insert("targetRpm".to_string(), SpnValue::Integer(i64::from(raw)));
            }
            if data.len() >= 3 {
                spns.insert("enable".to_string(), SpnValue::Bool(data[2] == 1));
            }
            // Byte 3 is fault-injection flags; 0xFF means none reported
            if data.len() >= 4 && data[3] != 0xFF {
                spns.insert(
                    "faultFlags".to_string(),
                    SpnValue::Integer(i64::from(data[3])),
                );
                spns.insert("overheat".to_string(), SpnValue::Bool(data[3] & 0x01 == 1));
            }
        }
        pgn::DM1 => {
            if !data.is_empty() {
                spns.insert(
                    "lampStatus".to_string(),
                    SpnValue::Integer(i64::from(data[0])),
                );
            }
            if data.len() >= 5 {
                // 19-bit SPN: bytes 2-3 plus the high 3 bits of byte 4
                let spn =
                    u32::from(data[2]) | u32::from(data[3]) << 8 | u32::from(data[4] & 0xE0) << 11;
                spns.insert("spn".to_string(), SpnValue::Integer(i64::from(spn)));
                spns.insert("fmi".to_string(), SpnValue::Integer(i64::from(data[4] & 0x1F)));
            }
        }
        _ => {}
    }

    spns
}

/// Encode a signal map into the wire payload for `group`.
///
/// The buffer is pre-filled with 0xFF and only the bytes the group
/// defines are overwritten; fields absent from the map take the group's
/// defaults. Unknown PGNs encode to eight 0xFF bytes.
pub fn encode_spns(group: u32, spns: &SpnMap) -> Vec<u8> {
    let mut data = vec![0xFF_u8; pgn::payload_len(group)];

    let int_field = |name: &str| spns.get(name).and_then(SpnValue::as_i64).unwrap_or(0);

    match group {
        pgn::REQUEST => {
            let requested = int_field("requestedPGN") as u32;
            data[0] = (requested & 0xFF) as u8;
            data[1] = ((requested >> 8) & 0xFF) as u8;
            data[2] = ((requested >> 16) & 0xFF) as u8;
        }
        pgn::ENGINE_CONTROL_CMD => {
            let target_rpm = int_field("targetRpm") as u16;
            data[0] = (target_rpm & 0xFF) as u8;
            data[1] = (target_rpm >> 8) as u8;
            data[2] = u8::from(spns.get("enable").and_then(SpnValue::as_bool).unwrap_or(false));
            data[3] = int_field("faultFlags") as u8;
        }
        pgn::EEC1 => {
            let speed = spns
                .get("engineSpeed")
                .and_then(SpnValue::as_f64)
                .unwrap_or(0.0);
            let raw_speed = (speed / 0.125) as u16;
            data[0] = 0xF0; // torque mode
            data[1] = 0xFF;
            data[2] = (int_field("torque") + 125) as u8;
            data[3] = (raw_speed & 0xFF) as u8;
            data[4] = (raw_speed >> 8) as u8;
        }
        pgn::ET1 => {
            data[0] = (int_field("coolantTemp") + 40) as u8;
        }
        _ => {}
    }

    data
}
