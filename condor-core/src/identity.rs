//! Decode 0x3f00/0x3f01 identity packets and maintain the cookie map.
//!
//! Identity payloads are semi-structured: length-prefixed ASCII fields at
//! fixed offsets, but individual packets are frequently short or carry
//! garbage in a slot. Every field is therefore a best-effort scan — a
//! prefix that runs past the buffer, or a non-printable run, yields
//! `Missing` rather than aborting the decode. Partial records are valid.
//!
//! Entity id 20001 carries full pilot data. Entity id 20002 is chat
//! traffic and entity id 1 is an abbreviated echo whose fields overwrite
//! good data with junk; both are skipped without error.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{
    read_lp_ascii, read_u16_le, read_u32_le, CondorError, Cookie, Result,
};

/// Entity id carrying the full pilot record.
const ENTITY_FULL: u32 = 20001;
/// Entity id used for chat lines, not players.
const ENTITY_CHAT: u32 = 20002;
/// Abbreviated echo; parsing it corrupts existing fields.
const ENTITY_ABBREVIATED: u32 = 1;

/// Fixed field offsets inside a full (entity 20001) identity payload.
const OFF_FIRST_NAME: usize = 19;
const OFF_LAST_NAME: usize = 36;
const OFF_COUNTRY: usize = 53;
const OFF_REGISTRATION: usize = 70;
const OFF_CALLSIGN: usize = 78;
const OFF_AIRCRAFT: usize = 189;

/// Result of scanning one identity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldScan {
    Found(String),
    Missing,
}

impl FieldScan {
    pub fn found(&self) -> Option<&str> {
        match self {
            FieldScan::Found(s) => Some(s),
            FieldScan::Missing => None,
        }
    }
}

/// One decoded identity packet.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUpdate {
    pub seq: u16,
    pub entity_id: u32,
    pub cookie: Cookie,
    pub callsign: FieldScan,
    pub first_name: FieldScan,
    pub last_name: FieldScan,
    pub registration: FieldScan,
    pub country: FieldScan,
    pub aircraft: FieldScan,
}

/// Decode outcome: an update to apply, or a deliberate skip.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityOutcome {
    Update(IdentityUpdate),
    /// Packet recognized but intentionally ignored (chat, abbreviated).
    Skipped(&'static str),
}

/// Scan one length-prefixed field at a fixed offset.
fn scan_field(b: &[u8], off: usize) -> FieldScan {
    match read_lp_ascii(b, off, 1, 64) {
        Some((s, _)) => {
            let s = s.trim().to_string();
            if s.is_empty() {
                FieldScan::Missing
            } else {
                FieldScan::Found(s)
            }
        }
        None => FieldScan::Missing,
    }
}

/// Decode a full identity datagram (header included).
pub fn decode_identity(data: &[u8]) -> Result<IdentityOutcome> {
    if data.len() < 20 {
        return Err(CondorError::Truncated {
            family: "identity",
            expected: 20,
            actual: data.len(),
        });
    }

    let seq = read_u16_le(data, 2).unwrap_or(0);
    let entity_id = read_u32_le(data, 4).unwrap_or(0);
    let cookie = read_u32_le(data, 8).unwrap_or(0);

    match entity_id {
        ENTITY_CHAT => return Ok(IdentityOutcome::Skipped("chat")),
        ENTITY_ABBREVIATED => return Ok(IdentityOutcome::Skipped("abbreviated")),
        _ => {}
    }

    let full = entity_id == ENTITY_FULL;
    let field = |off| {
        if full {
            scan_field(data, off)
        } else {
            FieldScan::Missing
        }
    };

    Ok(IdentityOutcome::Update(IdentityUpdate {
        seq,
        entity_id,
        cookie,
        callsign: field(OFF_CALLSIGN),
        first_name: field(OFF_FIRST_NAME),
        last_name: field(OFF_LAST_NAME),
        registration: field(OFF_REGISTRATION),
        country: field(OFF_COUNTRY),
        aircraft: field(OFF_AIRCRAFT),
    }))
}

// ---------------------------------------------------------------------------
// Cookie identity map
// ---------------------------------------------------------------------------

/// Best-known identity for one cookie. Empty string means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PilotIdentity {
    pub callsign: String,
    pub first_name: String,
    pub last_name: String,
    pub registration: String,
    pub country: String,
    pub aircraft: String,
}

impl PilotIdentity {
    /// Single display line: "CN First Last | Aircraft: X", or "unknown".
    pub fn display_line(&self) -> String {
        let parts: Vec<&str> = [
            self.callsign.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            return "unknown".into();
        }
        let mut line = parts.join(" ");
        if !self.aircraft.is_empty() {
            line.push_str(&format!(" | Aircraft: {}", self.aircraft));
        }
        line
    }
}

/// Cookie → identity mapping, plus entity-id → cookie bindings.
///
/// Mutated incrementally: new cookies are added and populated fields may
/// be refined by later packets; entries are never removed and a later
/// packet with fewer fields never blanks previously known ones. Owned by
/// the engine for one run; checkpointed externally, reset at process
/// start.
#[derive(Debug, Default)]
pub struct CookieIdentityMap {
    by_cookie: HashMap<Cookie, PilotIdentity>,
    entity_to_cookie: HashMap<u32, Cookie>,
}

impl CookieIdentityMap {
    pub fn new() -> Self {
        CookieIdentityMap::default()
    }

    /// Apply one decoded update. Returns true if any field changed.
    pub fn upsert(&mut self, update: &IdentityUpdate) -> bool {
        let entry = self.by_cookie.entry(update.cookie).or_default();
        let mut changed = false;

        let mut merge = |slot: &mut String, scan: &FieldScan| {
            if let Some(v) = scan.found() {
                if slot != v {
                    *slot = v.to_string();
                    changed = true;
                }
            }
        };
        merge(&mut entry.callsign, &update.callsign);
        merge(&mut entry.first_name, &update.first_name);
        merge(&mut entry.last_name, &update.last_name);
        merge(&mut entry.registration, &update.registration);
        merge(&mut entry.country, &update.country);
        merge(&mut entry.aircraft, &update.aircraft);

        if self.entity_to_cookie.insert(update.entity_id, update.cookie) != Some(update.cookie) {
            changed = true;
        }
        changed
    }

    /// Best-known (possibly partial) identity for a cookie.
    pub fn lookup(&self, cookie: Cookie) -> Option<&PilotIdentity> {
        self.by_cookie.get(&cookie)
    }

    pub fn cookie_for_entity(&self, entity_id: u32) -> Option<Cookie> {
        self.entity_to_cookie.get(&entity_id).copied()
    }

    pub fn cookies(&self) -> impl Iterator<Item = (Cookie, &PilotIdentity)> {
        self.by_cookie.iter().map(|(k, v)| (*k, v))
    }

    pub fn entities(&self) -> impl Iterator<Item = (u32, Cookie)> + '_ {
        self.entity_to_cookie.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.by_cookie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cookie.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a full identity packet with fields planted at their offsets.
    fn make_full_packet(cookie: Cookie, fields: &[(usize, &str)]) -> Vec<u8> {
        let mut b = vec![0u8; 224];
        b[0] = 0x3f;
        b[1] = 0x00;
        b[2..4].copy_from_slice(&5u16.to_le_bytes());
        b[4..8].copy_from_slice(&ENTITY_FULL.to_le_bytes());
        b[8..12].copy_from_slice(&cookie.to_le_bytes());
        for (off, val) in fields {
            b[*off] = val.len() as u8;
            b[off + 1..off + 1 + val.len()].copy_from_slice(val.as_bytes());
        }
        b
    }

    #[test]
    fn test_decode_full_identity() {
        let b = make_full_packet(
            0xcafe0001,
            &[
                (OFF_FIRST_NAME, "Jan"),
                (OFF_LAST_NAME, "Novak"),
                (OFF_COUNTRY, "SI"),
                (OFF_REGISTRATION, "D-1234"),
                (OFF_CALLSIGN, "JN"),
                (OFF_AIRCRAFT, "LS8 neo"),
            ],
        );
        let update = match decode_identity(&b).unwrap() {
            IdentityOutcome::Update(u) => u,
            other => panic!("expected update, got {other:?}"),
        };
        assert_eq!(update.cookie, 0xcafe0001);
        assert_eq!(update.seq, 5);
        assert_eq!(update.callsign, FieldScan::Found("JN".into()));
        assert_eq!(update.first_name, FieldScan::Found("Jan".into()));
        assert_eq!(update.aircraft, FieldScan::Found("LS8 neo".into()));
    }

    #[test]
    fn test_partial_identity_is_valid() {
        // Only the callsign slot populated; the rest scan as Missing.
        let b = make_full_packet(1, &[(OFF_CALLSIGN, "XY")]);
        let update = match decode_identity(&b).unwrap() {
            IdentityOutcome::Update(u) => u,
            other => panic!("expected update, got {other:?}"),
        };
        assert_eq!(update.callsign, FieldScan::Found("XY".into()));
        assert_eq!(update.first_name, FieldScan::Missing);
        assert_eq!(update.registration, FieldScan::Missing);
    }

    #[test]
    fn test_overrunning_prefix_is_missing() {
        // Aircraft slot near the end with a length past the buffer.
        let mut b = make_full_packet(1, &[(OFF_CALLSIGN, "XY")]);
        b[OFF_AIRCRAFT] = 200;
        let update = match decode_identity(&b).unwrap() {
            IdentityOutcome::Update(u) => u,
            other => panic!("expected update, got {other:?}"),
        };
        assert_eq!(update.aircraft, FieldScan::Missing);
    }

    #[test]
    fn test_chat_and_abbreviated_skipped() {
        let mut b = make_full_packet(1, &[]);
        b[4..8].copy_from_slice(&ENTITY_CHAT.to_le_bytes());
        assert_eq!(
            decode_identity(&b).unwrap(),
            IdentityOutcome::Skipped("chat")
        );

        b[4..8].copy_from_slice(&ENTITY_ABBREVIATED.to_le_bytes());
        assert_eq!(
            decode_identity(&b).unwrap(),
            IdentityOutcome::Skipped("abbreviated")
        );
    }

    #[test]
    fn test_too_short() {
        let err = decode_identity(&[0x3f, 0x00, 0, 0]).unwrap_err();
        assert!(matches!(err, CondorError::Truncated { family: "identity", .. }));
    }

    #[test]
    fn test_upsert_monotonic_enrichment() {
        let mut map = CookieIdentityMap::new();

        let b = make_full_packet(9, &[(OFF_CALLSIGN, "JN"), (OFF_AIRCRAFT, "LS8")]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        assert!(map.upsert(&u));

        // Later packet with fewer fields must not blank the known ones.
        let b = make_full_packet(9, &[(OFF_FIRST_NAME, "Jan")]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        map.upsert(&u);

        let ident = map.lookup(9).unwrap();
        assert_eq!(ident.callsign, "JN");
        assert_eq!(ident.aircraft, "LS8");
        assert_eq!(ident.first_name, "Jan");
    }

    #[test]
    fn test_upsert_refines_fields() {
        let mut map = CookieIdentityMap::new();

        let b = make_full_packet(9, &[(OFF_AIRCRAFT, "LS8")]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        map.upsert(&u);

        let b = make_full_packet(9, &[(OFF_AIRCRAFT, "LS8 neo")]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        assert!(map.upsert(&u));
        assert_eq!(map.lookup(9).unwrap().aircraft, "LS8 neo");
    }

    #[test]
    fn test_entity_binding() {
        let mut map = CookieIdentityMap::new();
        let b = make_full_packet(0xaa, &[]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        map.upsert(&u);
        assert_eq!(map.cookie_for_entity(ENTITY_FULL), Some(0xaa));
        assert_eq!(map.cookie_for_entity(777), None);
    }

    #[test]
    fn test_unchanged_upsert_reports_false() {
        let mut map = CookieIdentityMap::new();
        let b = make_full_packet(9, &[(OFF_CALLSIGN, "JN")]);
        let IdentityOutcome::Update(u) = decode_identity(&b).unwrap() else {
            panic!()
        };
        assert!(map.upsert(&u));
        assert!(!map.upsert(&u));
    }

    #[test]
    fn test_display_line() {
        let ident = PilotIdentity {
            callsign: "JN".into(),
            first_name: "Jan".into(),
            last_name: "Novak".into(),
            aircraft: "LS8".into(),
            ..Default::default()
        };
        assert_eq!(ident.display_line(), "JN Jan Novak | Aircraft: LS8");
        assert_eq!(PilotIdentity::default().display_line(), "unknown");
    }
}
