//! Shared types, error enum, and packet family metadata for condor-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by condor-core.
#[derive(Debug, Error)]
pub enum CondorError {
    #[error("{family} packet truncated: need {expected} bytes, got {actual}")]
    Truncated {
        family: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{what} out of range: {value} (limit {limit})")]
    OutOfRange {
        what: &'static str,
        value: u32,
        limit: u32,
    },
    #[error("coordinate helper unavailable: {0}")]
    HelperUnavailable(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("initialization failed: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, CondorError>;

// ---------------------------------------------------------------------------
// Packet families
// ---------------------------------------------------------------------------

/// Packet family, classified from the 16-bit header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketFamily {
    /// Per-tick motion/physics packet (tag 0x3d00).
    Telemetry,
    /// Full pilot identity packet (tag 0x3f00).
    IdentityFull,
    /// Incremental identity packet (tag 0x3f01).
    IdentityDelta,
    /// Flight task core: landscape + turnpoints (tag 0x1f00).
    TaskCore,
    /// First disabled-airspace list chunk (tag 0x0700).
    AirspaceListA,
    /// Continuation disabled-airspace chunk (tag 0x0f00).
    AirspaceListB,
    /// Settings bundle (tag 0x2f00).
    Settings,
    /// Short acknowledgement (tag prefix 0x8006).
    Ack,
    /// Anything else — dropped with a debug note, never fatal.
    Unknown,
}

/// Metadata for a packet family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyInfo {
    pub name: &'static str,
    /// Minimum datagram length in bytes for a decodable packet.
    pub min_len: usize,
}

/// Known family table. Tags are spelled as they appear on the wire
/// (first byte high), matching the hex-dump convention.
pub const FAMILY_TABLE: &[(u16, PacketFamily, FamilyInfo)] = &[
    (
        0x3d00,
        PacketFamily::Telemetry,
        FamilyInfo {
            name: "telemetry",
            min_len: 8 + 11 * 4,
        },
    ),
    (
        0x3f00,
        PacketFamily::IdentityFull,
        FamilyInfo {
            name: "identity",
            min_len: 20,
        },
    ),
    (
        0x3f01,
        PacketFamily::IdentityDelta,
        FamilyInfo {
            name: "identity-delta",
            min_len: 20,
        },
    ),
    (
        0x1f00,
        PacketFamily::TaskCore,
        FamilyInfo {
            name: "task",
            min_len: 4,
        },
    ),
    (
        0x0700,
        PacketFamily::AirspaceListA,
        FamilyInfo {
            name: "airspace",
            min_len: 8,
        },
    ),
    (
        0x0f00,
        PacketFamily::AirspaceListB,
        FamilyInfo {
            name: "airspace-cont",
            min_len: 8,
        },
    ),
    (
        0x2f00,
        PacketFamily::Settings,
        FamilyInfo {
            name: "settings",
            min_len: 4,
        },
    ),
    (
        0x8006,
        PacketFamily::Ack,
        FamilyInfo {
            name: "ack",
            min_len: 6,
        },
    ),
];

/// Look up family metadata. Returns `None` for `Unknown`.
pub fn family_info(family: PacketFamily) -> Option<&'static FamilyInfo> {
    FAMILY_TABLE
        .iter()
        .find(|(_, f, _)| *f == family)
        .map(|(_, _, info)| info)
}

// ---------------------------------------------------------------------------
// Cookie helpers
// ---------------------------------------------------------------------------

/// Opaque session/player identifier carried in several packet families.
pub type Cookie = u32;

/// Format a cookie as 8-char lowercase hex, the identity-map key format.
pub fn cookie_to_string(cookie: Cookie) -> String {
    format!("{cookie:08x}")
}

/// Parse an 8-char hex cookie string.
pub fn cookie_from_hex(hex: &str) -> Option<Cookie> {
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

// ---------------------------------------------------------------------------
// Byte readers (little-endian, bounds-checked)
// ---------------------------------------------------------------------------

pub fn read_u16_le(b: &[u8], off: usize) -> Option<u16> {
    b.get(off..off + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
}

pub fn read_u32_le(b: &[u8], off: usize) -> Option<u32> {
    b.get(off..off + 4)
        .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

pub fn read_f32_le(b: &[u8], off: usize) -> Option<f32> {
    read_u32_le(b, off).map(f32::from_bits)
}

pub fn read_f64_le(b: &[u8], off: usize) -> Option<f64> {
    b.get(off..off + 8).map(|s| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(s);
        f64::from_le_bytes(buf)
    })
}

/// Read a length-prefixed ASCII string: one length byte, then that many
/// printable-ASCII bytes. Returns `None` when the prefix overruns the
/// buffer, the length is outside `min_len..=max_len`, or a byte is not
/// printable.
pub fn read_lp_ascii(b: &[u8], off: usize, min_len: usize, max_len: usize) -> Option<(String, usize)> {
    let ln = *b.get(off)? as usize;
    if ln < min_len || ln > max_len {
        return None;
    }
    let s = b.get(off + 1..off + 1 + ln)?;
    if !s.iter().all(|&c| (32..127).contains(&c)) {
        return None;
    }
    Some((String::from_utf8_lossy(s).into_owned(), off + 1 + ln))
}

// ---------------------------------------------------------------------------
// Hex utilities (replay logs are one hex datagram per line)
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as lowercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
