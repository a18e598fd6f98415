//! SmartAPI wire types
//!
//! Request/response structures for the brokerage's REST API, plus the
//! conversion into gateway quote records.

use chrono::Utc;
use quotedeck_core::QuoteRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope every SmartAPI response is wrapped in
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errorcode: String,
    pub data: Option<T>,
}

/// Body for the loginByPassword exchange
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub clientcode: String,
    pub password: String,
    pub totp: String,
}

/// Token set in a successful login response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "feedToken")]
    pub feed_token: String,
}

/// Body for the quote endpoint
///
/// `exchange_tokens` maps exchange code to the instrument tokens requested
/// on that exchange, so one call covers several exchanges.
#[derive(Debug, Serialize)]
pub struct QuoteRequest {
    pub mode: &'static str,
    #[serde(rename = "exchangeTokens")]
    pub exchange_tokens: HashMap<&'static str, Vec<String>>,
}

impl QuoteRequest {
    /// FULL mode: LTP plus OHLC, change and volume fields
    pub fn full(exchange_tokens: HashMap<&'static str, Vec<String>>) -> Self {
        Self {
            mode: "FULL",
            exchange_tokens,
        }
    }
}

/// Payload of a quote response
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteData {
    #[serde(default)]
    pub fetched: Vec<FullQuote>,
    #[serde(default)]
    pub unfetched: Vec<UnfetchedQuote>,
}

/// One instrument the provider answered for, in FULL mode
#[derive(Debug, Clone, Deserialize)]
pub struct FullQuote {
    pub exchange: String,
    #[serde(rename = "tradingSymbol", default)]
    pub trading_symbol: String,
    #[serde(rename = "symbolToken")]
    pub symbol_token: String,
    pub ltp: Decimal,
    #[serde(default)]
    pub open: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub close: Option<Decimal>,
    #[serde(rename = "netChange", default)]
    pub net_change: Option<Decimal>,
    #[serde(rename = "percentChange", default)]
    pub percent_change: Option<Decimal>,
    #[serde(rename = "tradeVolume", default)]
    pub trade_volume: Option<u64>,
    #[serde(rename = "exchFeedTime", default)]
    pub exch_feed_time: Option<String>,
}

/// One instrument the provider could not answer for
#[derive(Debug, Clone, Deserialize)]
pub struct UnfetchedQuote {
    #[serde(default)]
    pub exchange: String,
    #[serde(rename = "symbolToken", default)]
    pub symbol_token: String,
    #[serde(default)]
    pub message: String,
}

impl FullQuote {
    /// Normalize into a gateway record under the dashboard's symbol
    pub fn to_quote_record(&self, symbol: &str) -> QuoteRecord {
        QuoteRecord {
            symbol: symbol.to_string(),
            price: self.ltp,
            change: self.net_change.unwrap_or_default(),
            change_percent: self.percent_change.unwrap_or_default(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.trade_volume,
            last_updated: Utc::now(),
            is_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Trimmed capture of a FULL-mode quote response
    const QUOTE_RESPONSE: &str = r#"{
        "status": true,
        "message": "SUCCESS",
        "errorcode": "",
        "data": {
            "fetched": [
                {
                    "exchange": "NSE",
                    "tradingSymbol": "Nifty 50",
                    "symbolToken": "99926000",
                    "ltp": 21850.50,
                    "open": 21808.40,
                    "high": 21905.15,
                    "low": 21790.00,
                    "close": 21808.40,
                    "netChange": 42.10,
                    "percentChange": 0.19,
                    "exchFeedTime": "21-Jun-2024 15:29:59"
                }
            ],
            "unfetched": [
                {
                    "exchange": "NSE",
                    "symbolToken": "0",
                    "message": "Symbol not found"
                }
            ]
        }
    }"#;

    #[test]
    fn deserializes_full_quote_response() {
        let envelope: ApiEnvelope<QuoteData> = serde_json::from_str(QUOTE_RESPONSE).unwrap();
        assert!(envelope.status);

        let data = envelope.data.unwrap();
        assert_eq!(data.fetched.len(), 1);
        assert_eq!(data.unfetched.len(), 1);

        let quote = &data.fetched[0];
        assert_eq!(quote.symbol_token, "99926000");
        assert_eq!(quote.ltp, dec!(21850.50));
        assert_eq!(quote.net_change, Some(dec!(42.10)));
    }

    #[test]
    fn deserializes_error_envelope() {
        let body = r#"{"status":false,"message":"Invalid Token","errorcode":"AG8001","data":null}"#;
        let envelope: ApiEnvelope<QuoteData> = serde_json::from_str(body).unwrap();
        assert!(!envelope.status);
        assert_eq!(envelope.errorcode, "AG8001");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn deserializes_login_data() {
        let body = r#"{
            "status": true,
            "message": "SUCCESS",
            "errorcode": "",
            "data": {"jwtToken": "abc", "refreshToken": "def", "feedToken": "ghi"}
        }"#;
        let envelope: ApiEnvelope<LoginData> = serde_json::from_str(body).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.jwt_token, "abc");
        assert_eq!(data.feed_token, "ghi");
    }

    #[test]
    fn normalizes_to_quote_record() {
        let envelope: ApiEnvelope<QuoteData> = serde_json::from_str(QUOTE_RESPONSE).unwrap();
        let quote = &envelope.data.unwrap().fetched[0];

        let record = quote.to_quote_record("NIFTY50");
        assert_eq!(record.symbol, "NIFTY50");
        assert_eq!(record.price, dec!(21850.50));
        assert_eq!(record.change, dec!(42.10));
        assert_eq!(record.open, Some(dec!(21808.40)));
        assert!(!record.is_fallback);
    }

    #[test]
    fn quote_request_serializes_exchange_map() {
        let mut tokens = HashMap::new();
        tokens.insert("NSE", vec!["99926000".to_string()]);
        let body = serde_json::to_value(QuoteRequest::full(tokens)).unwrap();

        assert_eq!(body["mode"], "FULL");
        assert_eq!(body["exchangeTokens"]["NSE"][0], "99926000");
    }
}
