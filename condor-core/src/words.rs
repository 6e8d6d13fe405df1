//! Word-level view of a telemetry payload.
//!
//! Telemetry payloads are a flat sequence of 4-byte little-endian words.
//! Different fields use different interpretations of the same bytes (the
//! cookie is an unsigned integer, positions are floats), so the view
//! exposes both without re-reading the buffer.

/// A payload viewed as little-endian 32-bit words.
#[derive(Debug, Clone)]
pub struct WordBuf {
    words: Vec<u32>,
}

impl WordBuf {
    /// Build from raw bytes. A trailing partial word is ignored, matching
    /// the producer's padding behavior.
    pub fn new(payload: &[u8]) -> Self {
        let words = payload
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        WordBuf { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word as unsigned 32-bit integer.
    pub fn u32(&self, idx: usize) -> Option<u32> {
        self.words.get(idx).copied()
    }

    /// Same word reinterpreted as IEEE-754 single-precision float.
    pub fn f32(&self, idx: usize) -> Option<f32> {
        self.u32(idx).map(f32::from_bits)
    }

    /// The last `n` words as raw u32 values (shorter slice if fewer exist).
    pub fn tail(&self, n: usize) -> Vec<u32> {
        let start = self.words.len().saturating_sub(n);
        self.words[start..].to_vec()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_interpretation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x1234abcdu32.to_le_bytes());
        bytes.extend_from_slice(&500.0f32.to_le_bytes());

        let buf = WordBuf::new(&bytes);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.u32(0), Some(0x1234abcd));
        assert_eq!(buf.f32(1), Some(500.0));
        // Same bytes, both views available.
        assert_eq!(buf.u32(1), Some(500.0f32.to_bits()));
    }

    #[test]
    fn test_partial_word_ignored() {
        let buf = WordBuf::new(&[1, 0, 0, 0, 0xFF, 0xFF]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.u32(0), Some(1));
        assert_eq!(buf.u32(1), None);
    }

    #[test]
    fn test_tail() {
        let mut bytes = Vec::new();
        for i in 0u32..8 {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        let buf = WordBuf::new(&bytes);
        assert_eq!(buf.tail(6), vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(buf.tail(10).len(), 8);
    }
}
