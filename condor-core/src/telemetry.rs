//! Decode 0x3d00 telemetry packets into per-tick vehicle records.
//!
//! Header: tag u16, counter u16, entity id u32; the payload from byte 8 is
//! a word sequence (see `words`). Word map:
//!
//! | idx | field        | view |
//! |-----|--------------|------|
//! | 0   | cookie       | u32  |
//! | 1   | reserved     | —    |
//! | 2,3 | pos_x, pos_y | f32  |
//! | 4   | altitude_m   | f32  |
//! | 5-7 | vx, vy, vz   | f32  |
//! | 8-10| ax, ay, az   | f32  |
//!
//! The last six words ride along as an opaque u32 tail for forward
//! compatibility. The g-force figure is a known-uncalibrated approximation
//! carried through unchanged; downstream consumers expect it as-is.

use serde::Serialize;

use crate::types::{read_u16_le, read_u32_le, CondorError, Cookie, Result};
use crate::words::WordBuf;

/// Meters to feet.
pub const FT_PER_M: f64 = 3.28084;
/// Meters-per-second to knots.
pub const KT_PER_MPS: f64 = 1.9438445;
/// Standard gravity, m/s².
pub const GRAVITY_MS2: f64 = 9.80665;

/// Payload bytes before the word sequence starts.
const HEADER_LEN: usize = 8;
/// Fewest words carrying the full field map.
const MIN_WORDS: usize = 11;

/// One decoded telemetry tick. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub cookie: Cookie,
    /// Packet counter from the datagram header.
    pub counter: u16,
    /// Entity identifier from the datagram header.
    pub entity_id: u32,

    // Raw fields
    pub pos_x: f32,
    pub pos_y: f32,
    pub altitude_m: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,

    // Derived quantities
    pub altitude_ft: f64,
    pub speed_mps: f64,
    pub speed_kt: f64,
    pub heading_deg: f64,
    pub vario_mps: f64,
    pub vario_kt: f64,
    pub a_mag: f64,
    pub g_force: f64,

    /// Geographic position from the coordinate converter; absent when
    /// conversion degraded for this packet.
    pub lon: Option<f64>,
    pub lat: Option<f64>,

    /// Last six payload words, semantics unknown, passed through raw.
    pub tail: Vec<u32>,
}

/// Decode a full telemetry datagram (header included).
pub fn decode_telemetry(data: &[u8]) -> Result<TelemetryRecord> {
    let words = WordBuf::new(data.get(HEADER_LEN..).unwrap_or(&[]));
    if words.len() < MIN_WORDS {
        return Err(CondorError::Truncated {
            family: "telemetry",
            expected: HEADER_LEN + MIN_WORDS * 4,
            actual: data.len(),
        });
    }

    let counter = read_u16_le(data, 2).unwrap_or(0);
    let entity_id = read_u32_le(data, 4).unwrap_or(0);

    let cookie = words.u32(0).unwrap_or(0);
    let pos_x = words.f32(2).unwrap_or(0.0);
    let pos_y = words.f32(3).unwrap_or(0.0);
    let altitude_m = words.f32(4).unwrap_or(0.0);
    let (vx, vy, vz) = (
        words.f32(5).unwrap_or(0.0),
        words.f32(6).unwrap_or(0.0),
        words.f32(7).unwrap_or(0.0),
    );
    let (ax, ay, az) = (
        words.f32(8).unwrap_or(0.0),
        words.f32(9).unwrap_or(0.0),
        words.f32(10).unwrap_or(0.0),
    );

    let speed_mps = ((vx as f64).powi(2) + (vy as f64).powi(2) + (vz as f64).powi(2)).sqrt();
    // vx is inverted relative to compass axes, hence the negation.
    let heading_deg = (-(vx as f64)).atan2(vy as f64).to_degrees().rem_euclid(360.0);
    let vario_mps = vz as f64;
    let a_mag = ((ax as f64).powi(2) + (ay as f64).powi(2) + (az as f64).powi(2)).sqrt();

    Ok(TelemetryRecord {
        cookie,
        counter,
        entity_id,
        pos_x,
        pos_y,
        altitude_m,
        vx,
        vy,
        vz,
        ax,
        ay,
        az,
        altitude_ft: altitude_m as f64 * FT_PER_M,
        speed_mps,
        speed_kt: speed_mps * KT_PER_MPS,
        heading_deg,
        vario_mps,
        vario_kt: vario_mps * KT_PER_MPS,
        a_mag,
        g_force: a_mag / GRAVITY_MS2,
        lon: None,
        lat: None,
        tail: words.tail(6),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
