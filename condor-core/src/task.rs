//! Decode 0x1f00 task packets: landscape name + turnpoint list.

use serde::Serialize;

use crate::types::{
    read_f32_le, read_f64_le, read_lp_ascii, read_u32_le, CondorError, Result,
};

/// Plausibility bound on the turnpoint count.
const MAX_TURNPOINTS: u32 = 64;

/// One task turnpoint. `angle` is the sector geometry/type tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turnpoint {
    pub name: String,
    pub x: f64,
    pub y: f32,
    pub radius: u32,
    pub angle: u32,
    pub altitude: f32,
}

/// The flight-task core. Replaced atomically when a newer packet arrives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskCore {
    pub landscape: String,
    pub turnpoints: Vec<Turnpoint>,
}

fn truncated(actual: usize) -> CondorError {
    CondorError::Truncated {
        family: "task",
        expected: actual + 1,
        actual,
    }
}

/// Decode a full task datagram (header included).
pub fn decode_task(data: &[u8]) -> Result<TaskCore> {
    if data.len() < 4 {
        return Err(CondorError::Truncated {
            family: "task",
            expected: 4,
            actual: data.len(),
        });
    }

    // tag u16, seq u16, then the landscape string.
    let mut off = 4;
    let (landscape, next) =
        read_lp_ascii(data, off, 1, 32).ok_or_else(|| truncated(data.len()))?;
    off = next;

    let count = read_u32_le(data, off).ok_or_else(|| truncated(data.len()))?;
    off += 4;
    if count == 0 || count > MAX_TURNPOINTS {
        return Err(CondorError::OutOfRange {
            what: "turnpoint count",
            value: count,
            limit: MAX_TURNPOINTS,
        });
    }

    let mut turnpoints = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (name, next) =
            read_lp_ascii(data, off, 1, 64).ok_or_else(|| truncated(data.len()))?;
        off = next;
        let x = read_f64_le(data, off).ok_or_else(|| truncated(data.len()))?;
        off += 8;
        let y = read_f32_le(data, off).ok_or_else(|| truncated(data.len()))?;
        off += 4;
        let radius = read_u32_le(data, off).ok_or_else(|| truncated(data.len()))?;
        off += 4;
        let angle = read_u32_le(data, off).ok_or_else(|| truncated(data.len()))?;
        off += 4;
        let altitude = read_f32_le(data, off).ok_or_else(|| truncated(data.len()))?;
        off += 4;

        turnpoints.push(Turnpoint {
            name,
            x,
            y,
            radius,
            angle,
            altitude,
        });
    }

    Ok(TaskCore {
        landscape,
        turnpoints,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
