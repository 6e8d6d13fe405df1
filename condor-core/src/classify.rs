//! Classify raw datagrams into packet families.
//!
//! The family is a 16-bit tag in the first two bytes, spelled as it
//! appears on the wire (`3d 00` classifies as 0x3d00). Unrecognized tags
//! map to `Unknown` and are dropped by the caller — never fatal.

use crate::types::{PacketFamily, FAMILY_TABLE};

/// Classify a datagram by its header tag.
pub fn classify(data: &[u8]) -> PacketFamily {
    if data.len() < 2 {
        return PacketFamily::Unknown;
    }
    let tag = u16::from_be_bytes([data[0], data[1]]);
    FAMILY_TABLE
        .iter()
        .find(|(t, _, _)| *t == tag)
        .map(|(_, family, _)| *family)
        .unwrap_or(PacketFamily::Unknown)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
