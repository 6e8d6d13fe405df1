//! Decode 0x2f00 settings packets: description, plane class, weather
//! zone, and named options.
//!
//! The settings bundle has no stable layout; it is recovered by scanning
//! the payload for plausible length-prefixed ASCII strings and applying
//! field heuristics observed on live traffic. The plane-class pick is an
//! explicit best guess and may come back "unknown"; downstream consumers
//! depend on these values as they are.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{read_lp_ascii, CondorError, Result};

/// Plane class when no candidate string matches.
pub const CLASS_UNKNOWN: &str = "unknown";

/// Keyword fragments that mark a string as a plane-class name
/// (competition class labels like "15-meter", "Club", type codes).
const PLANE_KEYWORDS: &[&str] = &["meter", "ms", "js", "as"];

/// Byte signature of 1500.0f32, the default start height.
const START_HEIGHT_SIG: [u8; 4] = [0x00, 0x80, 0xbb, 0x44];

/// The decoded settings bundle. Replaced atomically on each packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsBundle {
    pub description: String,
    /// Heuristic best guess; may be "unknown".
    pub plane_class: String,
    pub weather_zone: String,
    /// Named options recognized by fixed byte signatures.
    pub options: BTreeMap<String, String>,
}

/// Collect every plausible length-prefixed ASCII string in the payload.
fn scan_strings(data: &[u8]) -> Vec<String> {
    let mut strings = Vec::new();
    let mut i = 4.min(data.len());
    while i < data.len() {
        match read_lp_ascii(data, i, 1, 80) {
            Some((s, next)) => {
                strings.push(s);
                i = next;
            }
            None => i += 1,
        }
    }
    strings
}

/// Pick the plane-class string from the scanned candidates.
fn classify_plane(strings: &[String]) -> String {
    for s in strings {
        let lower = s.to_lowercase();
        if s.contains('-') || PLANE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return s.clone();
        }
    }
    CLASS_UNKNOWN.into()
}

/// Pick the weather-zone name: the literal "Base" zone when its signature
/// is present, else the first zone-length string in scan order. A padded
/// string stripping to exactly "Base" also names the base zone.
fn pick_weather_zone(data: &[u8], strings: &[String]) -> String {
    let sig: &[u8] = b"\x04Base";
    if data.windows(sig.len()).any(|w| w == sig) {
        return "Base".into();
    }
    for s in strings {
        if s.trim() == "Base" {
            return "Base".into();
        }
        if s.len() <= 8 {
            return s.clone();
        }
    }
    String::new()
}

/// Decode a full settings datagram (header included).
pub fn decode_settings(data: &[u8]) -> Result<SettingsBundle> {
    if data.len() < 4 {
        return Err(CondorError::Truncated {
            family: "settings",
            expected: 4,
            actual: data.len(),
        });
    }

    let strings = scan_strings(data);

    let description = strings
        .iter()
        .max_by_key(|s| s.len())
        .cloned()
        .unwrap_or_default();
    let plane_class = classify_plane(&strings);
    let weather_zone = pick_weather_zone(data, &strings);

    let mut options = BTreeMap::new();
    if data.windows(4).any(|w| w == START_HEIGHT_SIG) {
        options.insert("StartHeight".into(), "1500".into());
    }

    Ok(SettingsBundle {
        description,
        plane_class,
        weather_zone,
        options,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_settings_packet(strings: &[&str], with_start_height: bool) -> Vec<u8> {
        let mut b = vec![0x2f, 0x00, 0x01, 0x00];
        for s in strings {
            b.push(s.len() as u8);
            b.extend_from_slice(s.as_bytes());
            // Non-printable separator so adjacent strings don't merge.
            b.push(0x00);
        }
        if with_start_height {
            b.extend_from_slice(&START_HEIGHT_SIG);
        }
        b
    }

    #[test]
    fn test_decode_settings() {
        let b = make_settings_packet(
            &["18-meter", "Base", "Evening ridge run along the main spine"],
            true,
        );
        let settings = decode_settings(&b).unwrap();
        assert_eq!(settings.weather_zone, "Base");
        assert_eq!(settings.plane_class, "18-meter");
        assert_eq!(
            settings.description,
            "Evening ridge run along the main spine"
        );
        assert_eq!(settings.options.get("StartHeight").map(String::as_str), Some("1500"));
    }

    #[test]
    fn test_plane_class_unknown() {
        let b = make_settings_packet(&["Zone1", "short brief"], false);
        let settings = decode_settings(&b).unwrap();
        assert_eq!(settings.plane_class, CLASS_UNKNOWN);
        assert!(settings.options.is_empty());
    }

    #[test]
    fn test_plane_class_keyword() {
        let b = make_settings_packet(&["Morning brief", "15 Meter"], false);
        let settings = decode_settings(&b).unwrap();
        // First keyword match wins.
        assert_eq!(settings.plane_class, "15 Meter");
    }

    #[test]
    fn test_weather_zone_first_short_string() {
        let b = make_settings_packet(&["Alpine", "North", "a much longer description"], false);
        let settings = decode_settings(&b).unwrap();
        // Scan order decides between short candidates, not length.
        assert_eq!(settings.weather_zone, "Alpine");
    }

    #[test]
    fn test_weather_zone_two_short_candidates() {
        let b = make_settings_packet(&["Alpine", "North"], false);
        assert_eq!(decode_settings(&b).unwrap().weather_zone, "Alpine");
    }

    #[test]
    fn test_weather_zone_padded_base() {
        // Too long for the zone-length cut, but strips to the base zone.
        let b = make_settings_packet(&["a much longer description", "   Base   "], false);
        assert_eq!(decode_settings(&b).unwrap().weather_zone, "Base");
    }

    #[test]
    fn test_empty_payload() {
        let settings = decode_settings(&[0x2f, 0x00, 0x01, 0x00]).unwrap();
        assert!(settings.description.is_empty());
        assert_eq!(settings.plane_class, CLASS_UNKNOWN);
        assert!(settings.weather_zone.is_empty());
    }

    #[test]
    fn test_too_short() {
        assert!(decode_settings(&[0x2f]).is_err());
    }
}
