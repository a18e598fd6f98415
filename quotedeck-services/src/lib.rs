//! Gateway services for Quotedeck
//!
//! This crate provides the service layer between the HTTP API and the
//! brokerage client: outbound call serialization, quote caching, and the
//! never-failing market data gateway.

pub mod call_serializer;
pub mod market_data;
pub mod quote_cache;

pub use call_serializer::{CallSerializer, CallSerializerStats, DEFAULT_MIN_CALL_INTERVAL};
pub use market_data::{MarketDataConfig, MarketDataService, MIN_REFRESH_INTERVAL};
pub use quote_cache::{CacheStats, QuoteCache, DEFAULT_FRESHNESS_WINDOW};
