//! Normalized allocation caching using Moka.
//!
//! Normalization is re-run on every read. When that becomes hot, this cache
//! keys the result by the full serialized raw input plus totals, so a
//! changed document can never be served a stale result.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::normalize::normalize_allocation;
use super::types::{CanonicalAllocation, OrderFinancials, RawAllocation};

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Result of a cached normalization.
#[derive(Debug, Clone)]
pub struct CachedAllocation {
    /// Normalized allocation, `None` when the input had no entry array.
    pub allocation: Option<Arc<CanonicalAllocation>>,
    /// Whether the result came from the cache.
    pub cached: bool,
}

/// Cache for normalized allocations.
///
/// Thread-safe and suitable for concurrent access.
#[derive(Clone)]
pub struct NormalizationCache {
    cache: Cache<String, Option<Arc<CanonicalAllocation>>>,
}

impl NormalizationCache {
    /// Creates a new cache with default settings.
    ///
    /// Default: 1000 entries max, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a new cache with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries to cache
    /// * `ttl_secs` - Time-to-live in seconds for each entry
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Normalizes `allocation`, reusing an earlier result for identical input.
    ///
    /// A missing `appliedAt` falls back to the time of the first call.
    #[must_use]
    pub fn normalize_cached(
        &self,
        allocation: &RawAllocation,
        totals: &OrderFinancials,
    ) -> CachedAllocation {
        let Some(key) = cache_key(allocation, totals) else {
            return CachedAllocation {
                allocation: normalize_allocation(allocation, totals).map(Arc::new),
                cached: false,
            };
        };

        if let Some(hit) = self.cache.get(&key) {
            return CachedAllocation {
                allocation: hit,
                cached: true,
            };
        }

        let normalized = normalize_allocation(allocation, totals).map(Arc::new);
        self.cache.insert(key, normalized.clone());

        CachedAllocation {
            allocation: normalized,
            cached: false,
        }
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Invalidates the entry for one input.
    pub fn invalidate(&self, allocation: &RawAllocation, totals: &OrderFinancials) {
        if let Some(key) = cache_key(allocation, totals) {
            self.cache.invalidate(&key);
        }
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for NormalizationCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(allocation: &RawAllocation, totals: &OrderFinancials) -> Option<String> {
    serde_json::to_string(&(allocation, totals)).ok()
}
