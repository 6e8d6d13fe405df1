//! On-disk artifacts: the identity map JSON and flight-plan files.
//!
//! The identity map is regenerated whole from engine state (it is small)
//! and throttled so a busy server doesn't turn every packet into a disk
//! write; shutdown flushes unconditionally. The map is an artifact of the
//! current run: any file left by a previous run is deleted at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use serde_json::json;

use condor_core::{cookie_to_string, CookieIdentityMap, FlightPlanDocument, Result};

/// Minimum gap between identity map writes.
pub const IDENTITY_WRITE_INTERVAL: Duration = Duration::from_secs(5);

/// Throttled writer for the identity map JSON.
pub struct IdentityMapWriter {
    path: PathBuf,
    min_interval: Duration,
    last_write: Option<Instant>,
}

impl IdentityMapWriter {
    /// Deletes any stale map from a previous run.
    pub fn new(path: PathBuf) -> Self {
        let _ = fs::remove_file(&path);
        IdentityMapWriter {
            path,
            min_interval: IDENTITY_WRITE_INTERVAL,
            last_write: None,
        }
    }

    #[cfg(test)]
    fn with_interval(path: PathBuf, min_interval: Duration) -> Self {
        let _ = fs::remove_file(&path);
        IdentityMapWriter {
            path,
            min_interval,
            last_write: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write if the throttle interval has passed. Returns true on write.
    pub fn maybe_write(&mut self, map: &CookieIdentityMap) -> Result<bool> {
        if let Some(last) = self.last_write {
            if last.elapsed() < self.min_interval {
                return Ok(false);
            }
        }
        self.write(map)?;
        Ok(true)
    }

    /// Unconditional write, for shutdown.
    pub fn flush(&mut self, map: &CookieIdentityMap) -> Result<()> {
        self.write(map)
    }

    fn write(&mut self, map: &CookieIdentityMap) -> Result<()> {
        let mut by_cookie = serde_json::Map::new();
        for (cookie, ident) in map.cookies() {
            let value = serde_json::to_value(ident)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            by_cookie.insert(cookie_to_string(cookie), value);
        }
        let mut by_entity = serde_json::Map::new();
        for (entity_id, cookie) in map.entities() {
            by_entity.insert(entity_id.to_string(), cookie_to_string(cookie).into());
        }

        let doc = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "by_cookie": by_cookie,
            "by_entity": by_entity,
        });

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&doc).unwrap_or_default())?;
        self.last_write = Some(Instant::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Flight plan files
// ---------------------------------------------------------------------------

/// Timestamped flight-plan filename: `udp_fpl_YYYYMMDD_HHMMSS.fpl`.
pub fn flight_plan_filename(now: &DateTime<Local>) -> String {
    format!("udp_fpl_{}.fpl", now.format("%Y%m%d_%H%M%S"))
}

/// Write one flight-plan document into `dir`. Returns the file path.
pub fn write_flight_plan(dir: &Path, doc: &FlightPlanDocument) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(flight_plan_filename(&Local::now()));
    doc.write_to(&path)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
