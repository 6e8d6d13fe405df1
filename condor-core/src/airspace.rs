//! Decode 0x0700/0x0f00 chunked disabled-airspace packets and reassemble
//! the list across an unordered, lossy packet sequence.
//!
//! Each packet declares the total chunk count and carries one indexed
//! chunk of u16 airspace ids. The set is complete exactly when every
//! index in `[0, total)` has been received. A packet declaring a
//! different total starts a new generation: the list is a whole, not a
//! merge across producer restarts.

use std::collections::BTreeMap;

use crate::types::{read_u16_le, read_u32_le, CondorError, Result};

/// Plausibility bound on the declared chunk count.
const MAX_CHUNKS: u32 = 1024;

/// One decoded airspace chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirspaceChunk {
    pub index: u16,
    pub total: u32,
    pub ids: Vec<u16>,
}

/// Decode a full airspace datagram (header included).
pub fn decode_airspace_chunk(data: &[u8]) -> Result<AirspaceChunk> {
    if data.len() < 8 {
        return Err(CondorError::Truncated {
            family: "airspace",
            expected: 8,
            actual: data.len(),
        });
    }

    let index = read_u16_le(data, 2).unwrap_or(0);
    let total = read_u32_le(data, 4).unwrap_or(0);

    if total == 0 || total > MAX_CHUNKS {
        return Err(CondorError::OutOfRange {
            what: "airspace chunk total",
            value: total,
            limit: MAX_CHUNKS,
        });
    }
    if index as u32 >= total {
        return Err(CondorError::OutOfRange {
            what: "airspace chunk index",
            value: index as u32,
            limit: total,
        });
    }

    let mut ids = Vec::new();
    let mut off = 8;
    while let Some(v) = read_u16_le(data, off) {
        ids.push(v);
        off += 2;
    }

    Ok(AirspaceChunk { index, total, ids })
}

// ---------------------------------------------------------------------------
// Chunk set accumulator
// ---------------------------------------------------------------------------

/// Reassembly state for one generation of the disabled-airspace list.
#[derive(Debug, Clone, Default)]
pub struct AirspaceChunkSet {
    total: Option<u32>,
    chunks: BTreeMap<u16, Vec<u16>>,
    generation: u64,
}

impl AirspaceChunkSet {
    pub fn new() -> Self {
        AirspaceChunkSet::default()
    }

    /// Accept one decoded chunk. Duplicate chunks overwrite in place.
    /// Returns true when this chunk completed the set (a false→true
    /// completeness transition).
    pub fn accept(&mut self, chunk: AirspaceChunk) -> bool {
        if self.total != Some(chunk.total) {
            // New generation: discard prior chunks.
            if self.total.is_some() {
                self.generation += 1;
            }
            self.total = Some(chunk.total);
            self.chunks.clear();
        }

        let was_complete = self.is_complete();
        self.chunks.insert(chunk.index, chunk.ids);
        !was_complete && self.is_complete()
    }

    /// Complete ⇔ every index in `[0, total)` has been received.
    pub fn is_complete(&self) -> bool {
        match self.total {
            Some(total) => self.chunks.len() as u32 == total,
            None => false,
        }
    }

    /// Declared total for the current generation, if any packet arrived.
    pub fn total(&self) -> Option<u32> {
        self.total
    }

    /// Chunks received so far in the current generation.
    pub fn received(&self) -> usize {
        self.chunks.len()
    }

    /// Increments each time a differing declared total discards the set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All collected ids, ordered by chunk index.
    pub fn disabled_ids(&self) -> Vec<u16> {
        self.chunks.values().flatten().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
