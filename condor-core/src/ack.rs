//! Decode 0x8006 acknowledgement packets.
//!
//! A short server acknowledgement naming the competition number it acks.
//! Recognized mainly so these frequent packets don't inflate the unknown
//! counter.

use crate::types::{read_u16_le, CondorError, Result};

/// One decoded acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRecord {
    pub acked_cn: u16,
}

/// Decode a full ack datagram (header included).
pub fn decode_ack(data: &[u8]) -> Result<AckRecord> {
    if data.len() < 6 {
        return Err(CondorError::Truncated {
            family: "ack",
            expected: 6,
            actual: data.len(),
        });
    }
    let acked_cn = read_u16_le(data, 4).unwrap_or(0);
    Ok(AckRecord { acked_cn })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ack() {
        let b = [0x80, 0x06, 0x00, 0x00, 0x2a, 0x00];
        assert_eq!(decode_ack(&b).unwrap().acked_cn, 42);
    }

    #[test]
    fn test_too_short() {
        let err = decode_ack(&[0x80, 0x06, 0x00]).unwrap_err();
        assert!(matches!(err, CondorError::Truncated { family: "ack", .. }));
    }
}
