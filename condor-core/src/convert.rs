//! Coordinate conversion seam and the grid-quantized result cache.
//!
//! Landscape x/y meters become geographic lon/lat through an external
//! per-landscape converter. The seam is a trait so the engine stays pure;
//! the process-backed implementation lives with the listener. Conversion
//! is expensive, so results are cached on a 10 m grid: glider motion
//! within one cell reuses the cell's answer.

use std::collections::{HashMap, VecDeque};

use crate::types::Result;

/// Cache cell edge length, meters.
pub const GRID_M: f32 = 10.0;
/// Entry count that triggers an eviction sweep.
pub const CACHE_CAP: usize = 10_000;
/// Entries dropped per sweep, oldest first.
pub const EVICT_BATCH: usize = 2_000;

/// Converts landscape x/y meters to geographic (lon, lat) degrees.
pub trait CoordinateConverter {
    fn xy_to_lon_lat(&mut self, x: f32, y: f32) -> Result<(f64, f64)>;
}

/// FIFO-evicting cache keyed by 10 m grid cell.
#[derive(Debug, Default)]
pub struct GridCache {
    map: HashMap<(i64, i64), (f64, f64)>,
    order: VecDeque<(i64, i64)>,
    pub hits: u64,
    pub misses: u64,
}

fn cell(x: f32, y: f32) -> (i64, i64) {
    ((x / GRID_M).round() as i64, (y / GRID_M).round() as i64)
}

impl GridCache {
    pub fn new() -> Self {
        GridCache::default()
    }

    pub fn get(&mut self, x: f32, y: f32) -> Option<(f64, f64)> {
        match self.map.get(&cell(x, y)) {
            Some(v) => {
                self.hits += 1;
                Some(*v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert one miss result. Call only after `get` returned `None` for
    /// the same cell; keys are never re-inserted while live, which keeps
    /// the insertion-order queue in sync with the map.
    pub fn insert(&mut self, x: f32, y: f32, lon_lat: (f64, f64)) {
        if self.map.len() >= CACHE_CAP {
            for _ in 0..EVICT_BATCH {
                match self.order.pop_front() {
                    Some(k) => {
                        self.map.remove(&k);
                    }
                    None => break,
                }
            }
        }
        let k = cell(x, y);
        if self.map.insert(k, lon_lat).is_none() {
            self.order.push_back(k);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Wraps any converter with the grid cache.
pub struct CachedConverter<C> {
    inner: C,
    pub cache: GridCache,
}

impl<C: CoordinateConverter> CachedConverter<C> {
    pub fn new(inner: C) -> Self {
        CachedConverter {
            inner,
            cache: GridCache::new(),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: CoordinateConverter> CoordinateConverter for CachedConverter<C> {
    fn xy_to_lon_lat(&mut self, x: f32, y: f32) -> Result<(f64, f64)> {
        if let Some(v) = self.cache.get(x, y) {
            return Ok(v);
        }
        let v = self.inner.xy_to_lon_lat(x, y)?;
        self.cache.insert(x, y, v);
        Ok(v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts real conversions; answer derived from the inputs.
    struct CountingConverter {
        calls: u64,
    }

    impl CoordinateConverter for CountingConverter {
        fn xy_to_lon_lat(&mut self, x: f32, y: f32) -> Result<(f64, f64)> {
            self.calls += 1;
            Ok((x as f64 / 1000.0, y as f64 / 1000.0))
        }
    }

    fn cached() -> CachedConverter<CountingConverter> {
        CachedConverter::new(CountingConverter { calls: 0 })
    }

    #[test]
    fn test_same_cell_hits() {
        let mut c = cached();
        let a = c.xy_to_lon_lat(100.0, 200.0).unwrap();
        // 3 m away: same 10 m cell, no second conversion.
        let b = c.xy_to_lon_lat(103.0, 198.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(c.into_inner().calls, 1);
    }

    #[test]
    fn test_distinct_cells_convert() {
        let mut c = cached();
        c.xy_to_lon_lat(100.0, 200.0).unwrap();
        c.xy_to_lon_lat(130.0, 200.0).unwrap();
        assert_eq!(c.cache.misses, 2);
        assert_eq!(c.cache.hits, 0);
        assert_eq!(c.into_inner().calls, 2);
    }

    #[test]
    fn test_hit_miss_counters() {
        let mut c = cached();
        c.xy_to_lon_lat(0.0, 0.0).unwrap();
        c.xy_to_lon_lat(1.0, 1.0).unwrap();
        c.xy_to_lon_lat(500.0, 0.0).unwrap();
        assert_eq!(c.cache.hits, 1);
        assert_eq!(c.cache.misses, 2);
    }

    #[test]
    fn test_eviction_batch() {
        let mut cache = GridCache::new();
        for i in 0..CACHE_CAP {
            cache.insert(i as f32 * GRID_M, 0.0, (0.0, 0.0));
        }
        assert_eq!(cache.len(), CACHE_CAP);

        // One more insert sweeps out the oldest batch.
        cache.insert(-GRID_M, 0.0, (1.0, 1.0));
        assert_eq!(cache.len(), CACHE_CAP - EVICT_BATCH + 1);

        // Oldest entries are gone, newest survive.
        assert!(cache.get(0.0, 0.0).is_none());
        assert!(cache.get((CACHE_CAP - 1) as f32 * GRID_M, 0.0).is_some());
        assert_eq!(cache.get(-GRID_M, 0.0), Some((1.0, 1.0)));
    }

    #[test]
    fn test_error_not_cached() {
        struct Flaky {
            fail_first: bool,
        }
        impl CoordinateConverter for Flaky {
            fn xy_to_lon_lat(&mut self, _x: f32, _y: f32) -> Result<(f64, f64)> {
                if self.fail_first {
                    self.fail_first = false;
                    return Err(crate::types::CondorError::HelperUnavailable(
                        "timeout".into(),
                    ));
                }
                Ok((15.0, 46.0))
            }
        }

        let mut c = CachedConverter::new(Flaky { fail_first: true });
        assert!(c.xy_to_lon_lat(0.0, 0.0).is_err());
        // Retry on the same cell reaches the converter again.
        assert_eq!(c.xy_to_lon_lat(0.0, 0.0).unwrap(), (15.0, 46.0));
    }
}
