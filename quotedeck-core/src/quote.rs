//! Quote data structures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A point-in-time price snapshot for a tradable instrument
///
/// Records are immutable once stored: a newer fetch produces a new record
/// with a later `last_updated`, it never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Dashboard symbol (e.g. "SENSEX", "NIFTY50")
    pub symbol: String,

    /// Last traded price
    pub price: Decimal,

    /// Net change since the previous close
    pub change: Decimal,

    /// Net change as a percentage
    pub change_percent: Decimal,

    /// Opening price for the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Session high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Session low
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Previous close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,

    /// Traded volume, when the provider reports one (indices do not)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    /// When this record was produced
    pub last_updated: DateTime<Utc>,

    /// True when this record came from the static fallback table rather
    /// than a live provider response
    #[serde(default)]
    pub is_fallback: bool,
}

impl QuoteRecord {
    /// Check whether a record produced at `timestamp` is still fresh
    pub fn is_data_fresh(timestamp: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        Utc::now().signed_duration_since(timestamp) < max_age
    }

    /// Whether today's session is up on the previous close
    pub fn is_up(&self) -> bool {
        self.change >= Decimal::ZERO
    }
}

/// A quote delivery to an auto-refresh subscriber
///
/// Carries either live data (`error` is `None`) or fallback data together
/// with the reason live data could not be obtained.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteUpdate {
    pub record: QuoteRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteUpdate {
    /// A live update with no attached error
    pub fn live(record: QuoteRecord) -> Self {
        Self {
            record,
            error: None,
        }
    }

    /// A degraded update: fallback data plus the failure that caused it
    pub fn degraded(record: QuoteRecord, error: impl Into<String>) -> Self {
        Self {
            record,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn record() -> QuoteRecord {
        QuoteRecord {
            symbol: "SENSEX".to_string(),
            price: dec!(72500.33),
            change: dec!(130.75),
            change_percent: dec!(0.18),
            open: Some(dec!(72410.10)),
            high: Some(dec!(72650.00)),
            low: Some(dec!(72300.45)),
            close: Some(dec!(72369.58)),
            volume: None,
            last_updated: Utc::now(),
            is_fallback: false,
        }
    }

    #[test]
    fn fresh_timestamp_is_fresh() {
        let ts = Utc::now() - Duration::seconds(30);
        assert!(QuoteRecord::is_data_fresh(ts, Duration::seconds(60)));
    }

    #[test]
    fn stale_timestamp_is_not_fresh() {
        let ts = Utc::now() - Duration::seconds(61);
        assert!(!QuoteRecord::is_data_fresh(ts, Duration::seconds(60)));
    }

    #[test]
    fn serializes_without_null_optionals() {
        let mut r = record();
        r.volume = None;
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("volume"));
        assert!(json.contains("\"symbol\":\"SENSEX\""));
    }

    #[test]
    fn update_constructors() {
        let live = QuoteUpdate::live(record());
        assert!(live.error.is_none());

        let degraded = QuoteUpdate::degraded(record(), "provider down");
        assert_eq!(degraded.error.as_deref(), Some("provider down"));
    }
}
