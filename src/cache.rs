// 🗃️ Growth Cache - optional memoization for presentation layers
// Keyed by a SHA-256 fingerprint of (records, dimension keys, lags).
// Results are identical with or without the cache.

use crate::error::Result;
use crate::growth::{growth_metrics, GrowthConfig, GrowthTable};
use crate::record::{Dimension, RegistrationRecord};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Length-prefixed field, so labels containing separators cannot collide
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Content fingerprint of a growth request
pub fn fingerprint(
    records: &[RegistrationRecord],
    dimensions: &[Dimension],
    config: &GrowthConfig,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update((records.len() as u64).to_le_bytes());
    for r in records {
        update_field(&mut hasher, r.date.to_string().as_bytes());
        update_field(&mut hasher, r.vehicle_category.as_bytes());
        update_field(&mut hasher, r.manufacturer.as_bytes());
        hasher.update(r.registrations.to_le_bytes());
    }

    hasher.update((dimensions.len() as u64).to_le_bytes());
    for dim in dimensions {
        update_field(&mut hasher, dim.as_str().as_bytes());
    }
    hasher.update((config.qoq_lag as u64).to_le_bytes());
    hasher.update((config.yoy_lag as u64).to_le_bytes());

    format!("{:x}", hasher.finalize())
}

/// Bounded LRU cache of growth tables
#[derive(Debug)]
pub struct GrowthCache {
    /// `None` when capacity is zero: nothing is stored
    entries: Option<LruCache<String, Arc<GrowthTable>>>,
    hits: u64,
    misses: u64,
}

impl GrowthCache {
    pub fn new(capacity: usize) -> Self {
        GrowthCache {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    /// Return the memoized table or compute and remember it.
    ///
    /// Errors are never cached.
    pub fn get_or_compute(
        &mut self,
        records: &[RegistrationRecord],
        dimensions: &[Dimension],
        config: &GrowthConfig,
    ) -> Result<Arc<GrowthTable>> {
        let key = fingerprint(records, dimensions, config);

        if let Some(table) = self.entries.as_mut().and_then(|e| e.get(&key)) {
            self.hits += 1;
            debug!(key = %&key[..12], "growth cache hit");
            return Ok(Arc::clone(table));
        }

        self.misses += 1;
        let table = Arc::new(growth_metrics(records, dimensions, config)?);

        if let Some(entries) = self.entries.as_mut() {
            entries.put(key, Arc::clone(&table));
        }

        Ok(table)
    }
}
