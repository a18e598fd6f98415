//! Market data service
//!
//! Composes the call serializer, quote cache, and quote provider into the
//! consumer-facing gateway: quote retrieval never surfaces an error, only
//! live data or flagged fallback data, and periodic auto-refresh
//! subscriptions deliver whichever of the two is available.

use crate::call_serializer::{CallSerializer, CallSerializerStats, DEFAULT_MIN_CALL_INTERVAL};
use crate::quote_cache::{CacheStats, QuoteCache, DEFAULT_FRESHNESS_WINDOW};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quotedeck_core::{
    fallback_quote, lookup_instrument, GatewayError, QuoteProvider, QuoteRecord, QuoteUpdate,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Floor for auto-refresh periods, protecting the provider rate limit
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Tunables for the market data service
///
/// The reference values (100 ms spacing, 60 s freshness, 10 s refresh
/// floor) are defaults, not protocol requirements.
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    /// Maximum age at which a cached quote is still served
    pub freshness_window: Duration,
    /// Minimum spacing between provider dispatches
    pub min_call_interval: Duration,
    /// Lower clamp for auto-refresh periods
    pub min_refresh_interval: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            min_call_interval: DEFAULT_MIN_CALL_INTERVAL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        }
    }
}

/// The consumer-facing market data gateway
pub struct MarketDataService {
    provider: Arc<dyn QuoteProvider>,
    serializer: CallSerializer,
    cache: QuoteCache,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
    config: MarketDataConfig,
}

impl MarketDataService {
    /// Create a new service over the given provider
    pub fn new(provider: Arc<dyn QuoteProvider>, config: MarketDataConfig) -> Self {
        Self {
            provider,
            serializer: CallSerializer::new(config.min_call_interval, "angelone"),
            cache: QuoteCache::new(config.freshness_window),
            subscriptions: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Create a service with the reference configuration
    pub fn with_defaults(provider: Arc<dyn QuoteProvider>) -> Self {
        Self::new(provider, MarketDataConfig::default())
    }

    /// Get a quote for a symbol
    ///
    /// Never fails: on any error at any stage (unknown symbol, transport,
    /// auth, malformed response) the static fallback record for that
    /// symbol is returned instead.
    pub async fn get_quote(&self, symbol: &str) -> QuoteRecord {
        self.quote_update(symbol).await.record
    }

    /// Get a quote together with the error that degraded it, if any
    pub async fn quote_update(&self, symbol: &str) -> QuoteUpdate {
        let Some(inst) = lookup_instrument(symbol) else {
            // Short-circuits without a network call
            warn!("Unknown symbol {}, serving synthetic fallback", symbol);
            let reason = GatewayError::unknown_symbol(symbol).to_string();
            return QuoteUpdate::degraded(fallback_quote(symbol), reason);
        };

        if let Some(record) = self.cache.get(inst.symbol) {
            debug!("Cache hit for {}", inst.symbol);
            return QuoteUpdate::live(record);
        }

        let provider = Arc::clone(&self.provider);
        let result = self
            .serializer
            .run(|| async move { provider.fetch_quotes(&[inst]).await })
            .await;

        match result {
            Ok(records) => match records.into_iter().find(|r| r.symbol == inst.symbol) {
                Some(record) => {
                    self.cache.put(record.clone());
                    QuoteUpdate::live(record)
                }
                None => {
                    warn!("Provider response missing {}, serving fallback", inst.symbol);
                    QuoteUpdate::degraded(
                        fallback_quote(inst.symbol),
                        format!("Provider response missing {}", inst.symbol),
                    )
                }
            },
            Err(e) => {
                warn!("Failed to fetch {}: {}, serving fallback", inst.symbol, e);
                QuoteUpdate::degraded(fallback_quote(inst.symbol), e.to_string())
            }
        }
    }

    /// Get quotes for several symbols
    ///
    /// Cache hits are served directly; all misses go upstream in a single
    /// provider call (the provider batches them by exchange). Failure
    /// degrades to one fallback record per missed symbol.
    pub async fn get_quotes(&self, symbols: &[&str]) -> Vec<QuoteRecord> {
        let mut results: Vec<Option<QuoteRecord>> = vec![None; symbols.len()];
        let mut misses = Vec::new();

        for (i, symbol) in symbols.iter().enumerate() {
            match lookup_instrument(symbol) {
                None => {
                    warn!("Unknown symbol {}, serving synthetic fallback", symbol);
                    results[i] = Some(fallback_quote(symbol));
                }
                Some(inst) => match self.cache.get(inst.symbol) {
                    Some(record) => results[i] = Some(record),
                    None => misses.push((i, inst)),
                },
            }
        }

        if !misses.is_empty() {
            let to_fetch: Vec<_> = misses.iter().map(|(_, inst)| *inst).collect();
            let provider = Arc::clone(&self.provider);
            let fetched = self
                .serializer
                .run(|| async move { provider.fetch_quotes(&to_fetch).await })
                .await;

            match fetched {
                Ok(records) => {
                    for record in &records {
                        self.cache.put(record.clone());
                    }
                    for (i, inst) in misses {
                        results[i] = Some(
                            records
                                .iter()
                                .find(|r| r.symbol == inst.symbol)
                                .cloned()
                                .unwrap_or_else(|| fallback_quote(inst.symbol)),
                        );
                    }
                }
                Err(e) => {
                    warn!("Batch fetch failed: {}, serving fallbacks", e);
                    for (i, inst) in misses {
                        results[i] = Some(fallback_quote(inst.symbol));
                    }
                }
            }
        }

        results.into_iter().flatten().collect()
    }

    /// Start delivering periodic quote updates for a symbol
    ///
    /// The period is clamped to [`MarketDataConfig::min_refresh_interval`]
    /// however small the request. Each tick delivers live data or fallback
    /// data plus an error string; the callback is never handed a panic.
    /// Starting a symbol that is already running replaces its task.
    pub fn start_auto_refresh<F>(self: &Arc<Self>, symbol: &str, period: Duration, on_update: F)
    where
        F: Fn(QuoteUpdate) + Send + Sync + 'static,
    {
        let period = period.max(self.config.min_refresh_interval);
        let canonical = canonical_symbol(symbol);

        info!("Starting auto-refresh for {} every {:?}", canonical, period);

        // The task holds only a weak handle; a strong one would keep the
        // service (and thus the task) alive forever.
        let service = Arc::downgrade(self);
        let task_symbol = canonical.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                let update = service.quote_update(&task_symbol).await;
                on_update(update);
            }
        });

        let mut subscriptions = self.subscriptions.lock();
        if let Some(previous) = subscriptions.insert(canonical, handle) {
            previous.abort();
        }
    }

    /// Stop auto-refresh for a symbol; no-op if none is running
    ///
    /// An in-flight fetch completes on its own; its delivery is dropped
    /// with the task at the next await point.
    pub fn stop_auto_refresh(&self, symbol: &str) {
        let canonical = canonical_symbol(symbol);
        let mut subscriptions = self.subscriptions.lock();
        if let Some(handle) = subscriptions.remove(&canonical) {
            handle.abort();
            info!("Stopped auto-refresh for {}", canonical);
        }
    }

    /// Stop every active auto-refresh subscription; idempotent
    pub fn stop_all_auto_refresh(&self) {
        let mut subscriptions = self.subscriptions.lock();
        let count = subscriptions.len();
        for (_, handle) in subscriptions.drain() {
            handle.abort();
        }
        if count > 0 {
            info!("Stopped {} auto-refresh subscription(s)", count);
        }
    }

    /// Symbols with an active auto-refresh subscription
    pub fn active_subscriptions(&self) -> Vec<String> {
        let subscriptions = self.subscriptions.lock();
        subscriptions.keys().cloned().collect()
    }

    /// When the stored record for a symbol was produced, fresh or not
    pub fn last_update_time(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.cache.last_update_time(&canonical_symbol(symbol))
    }

    /// Check whether a record produced at `timestamp` is within `max_age`
    pub fn is_data_fresh(timestamp: DateTime<Utc>, max_age: Duration) -> bool {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        QuoteRecord::is_data_fresh(timestamp, max_age)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get serializer statistics
    pub fn serializer_stats(&self) -> CallSerializerStats {
        self.serializer.stats()
    }
}

impl Drop for MarketDataService {
    fn drop(&mut self) {
        self.stop_all_auto_refresh();
    }
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The table spelling of a symbol, or its uppercased form when unknown
fn canonical_symbol(symbol: &str) -> String {
    lookup_instrument(symbol)
        .map(|inst| inst.symbol.to_string())
        .unwrap_or_else(|| symbol.to_uppercase())
}
