//! Quote cache
//!
//! In-memory, time-boxed cache of the last fetched quote per symbol.
//! Stale entries are not evicted, only superseded by the next write; the
//! map is bounded by the static symbol universe, so it stays tiny.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quotedeck_core::QuoteRecord;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// How long a cached quote is served before being refetched
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Cached quote with storage metadata
#[derive(Debug, Clone)]
struct CachedQuote {
    record: QuoteRecord,
    stored_at: Instant,
}

impl CachedQuote {
    fn is_fresh(&self, window: Duration) -> bool {
        self.stored_at.elapsed() < window
    }
}

/// Per-symbol quote cache with a freshness window
#[derive(Debug)]
pub struct QuoteCache {
    entries: RwLock<HashMap<String, CachedQuote>>,
    window: Duration,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

impl QuoteCache {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window,
        }
    }

    /// Get the cached record for a symbol, if still fresh
    ///
    /// A stale entry is a miss; it stays in the map until the next write
    /// for that symbol supersedes it.
    pub fn get(&self, symbol: &str) -> Option<QuoteRecord> {
        let entries = self.entries.read();
        entries
            .get(symbol)
            .filter(|cached| cached.is_fresh(self.window))
            .map(|cached| cached.record.clone())
    }

    /// Store a record under its symbol, superseding any previous entry
    pub fn put(&self, record: QuoteRecord) {
        let mut entries = self.entries.write();
        entries.insert(
            record.symbol.clone(),
            CachedQuote {
                record,
                stored_at: Instant::now(),
            },
        );
    }

    /// When the stored record for a symbol was produced, fresh or not
    pub fn last_update_time(&self, symbol: &str) -> Option<DateTime<Utc>> {
        let entries = self.entries.read();
        entries.get(symbol).map(|cached| cached.record.last_updated)
    }

    /// Get the configured freshness window
    pub fn freshness_window(&self) -> Duration {
        self.window
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let total = entries.len();
        let fresh = entries
            .values()
            .filter(|cached| cached.is_fresh(self.window))
            .count();

        CacheStats {
            total,
            fresh,
            stale: total - fresh,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
}
