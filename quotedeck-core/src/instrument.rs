//! Instrument definitions and the static symbol table
//!
//! Maps the dashboard's human-readable symbols to the brokerage's
//! exchange code + instrument token pairs, and carries the static
//! fallback values served when live data cannot be obtained.

use crate::quote::QuoteRecord;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchanges the gateway can route quote requests to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// National Stock Exchange of India
    Nse,
    /// Bombay Stock Exchange
    Bse,
}

impl Exchange {
    /// Exchange code as the provider's quote API expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NSE" => Ok(Exchange::Nse),
            "BSE" => Ok(Exchange::Bse),
            _ => Err(format!("Unknown exchange: {}", s)),
        }
    }
}

/// A tradable instrument known to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    /// Dashboard symbol
    pub symbol: &'static str,
    /// Exchange the instrument trades on
    pub exchange: Exchange,
    /// Provider-internal instrument token
    pub token: &'static str,
    /// Display name
    pub name: &'static str,
}

/// The fixed symbol universe the dashboard requests
///
/// Index tokens are Angel One's synthetic index identifiers; equity tokens
/// are NSE scrip tokens.
pub const INSTRUMENTS: &[Instrument] = &[
    Instrument {
        symbol: "SENSEX",
        exchange: Exchange::Bse,
        token: "99919000",
        name: "BSE SENSEX",
    },
    Instrument {
        symbol: "NIFTY50",
        exchange: Exchange::Nse,
        token: "99926000",
        name: "NIFTY 50",
    },
    Instrument {
        symbol: "BANKNIFTY",
        exchange: Exchange::Nse,
        token: "99926009",
        name: "NIFTY BANK",
    },
    Instrument {
        symbol: "RELIANCE",
        exchange: Exchange::Nse,
        token: "2885",
        name: "Reliance Industries",
    },
    Instrument {
        symbol: "TCS",
        exchange: Exchange::Nse,
        token: "11536",
        name: "Tata Consultancy Services",
    },
    Instrument {
        symbol: "HDFCBANK",
        exchange: Exchange::Nse,
        token: "1333",
        name: "HDFC Bank",
    },
    Instrument {
        symbol: "INFY",
        exchange: Exchange::Nse,
        token: "1594",
        name: "Infosys",
    },
];

/// Look up an instrument by dashboard symbol (case-insensitive)
pub fn lookup_instrument(symbol: &str) -> Option<&'static Instrument> {
    INSTRUMENTS
        .iter()
        .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
}

/// Static fallback values per known symbol: (price, change, change_percent)
fn fallback_values(symbol: &str) -> (Decimal, Decimal, Decimal) {
    match symbol {
        "SENSEX" => (dec!(72500.33), dec!(130.75), dec!(0.18)),
        "NIFTY50" => (dec!(21850.50), dec!(42.10), dec!(0.19)),
        "BANKNIFTY" => (dec!(46320.15), dec!(-85.40), dec!(-0.18)),
        "RELIANCE" => (dec!(2456.75), dec!(12.30), dec!(0.50)),
        "TCS" => (dec!(3890.20), dec!(-18.65), dec!(-0.48)),
        "HDFCBANK" => (dec!(1542.85), dec!(6.40), dec!(0.42)),
        "INFY" => (dec!(1618.55), dec!(9.85), dec!(0.61)),
        // Generic synthetic fallback for symbols outside the table
        _ => (dec!(1000.00), dec!(0.00), dec!(0.00)),
    }
}

/// Build the fallback record for a symbol
///
/// Every known symbol has fixed substitute values; unknown symbols get a
/// generic synthetic record. The record is flagged so consumers can render
/// a "data may be stale" indicator.
pub fn fallback_quote(symbol: &str) -> QuoteRecord {
    let canonical = lookup_instrument(symbol)
        .map(|i| i.symbol.to_string())
        .unwrap_or_else(|| symbol.to_uppercase());
    let (price, change, change_percent) = fallback_values(&canonical);

    QuoteRecord {
        symbol: canonical,
        price,
        change,
        change_percent,
        open: Some(price - change),
        high: Some(price),
        low: Some(price - change),
        close: Some(price - change),
        volume: None,
        last_updated: Utc::now(),
        is_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup_instrument("sensex").is_some());
        assert!(lookup_instrument("SENSEX").is_some());
        assert!(lookup_instrument("Nifty50").is_some());
    }

    #[test]
    fn unknown_symbol_misses_table() {
        assert!(lookup_instrument("DOGECOIN").is_none());
    }

    #[test]
    fn index_tokens_route_to_expected_exchange() {
        let sensex = lookup_instrument("SENSEX").unwrap();
        assert_eq!(sensex.exchange, Exchange::Bse);
        assert_eq!(sensex.token, "99919000");

        let nifty = lookup_instrument("NIFTY50").unwrap();
        assert_eq!(nifty.exchange, Exchange::Nse);
    }

    #[test]
    fn known_fallback_has_documented_values() {
        let q = fallback_quote("SENSEX");
        assert!(q.is_fallback);
        assert_eq!(q.price, dec!(72500.33));
        assert_eq!(q.change, dec!(130.75));
    }

    #[test]
    fn unknown_fallback_is_generic_synthetic() {
        let q = fallback_quote("DOGECOIN");
        assert!(q.is_fallback);
        assert_eq!(q.symbol, "DOGECOIN");
        assert_eq!(q.price, dec!(1000.00));
        assert_eq!(q.change, Decimal::ZERO);
    }

    #[test]
    fn exchange_round_trips_from_str() {
        assert_eq!("nse".parse::<Exchange>().unwrap(), Exchange::Nse);
        assert_eq!("BSE".parse::<Exchange>().unwrap(), Exchange::Bse);
        assert!("NYSE".parse::<Exchange>().is_err());
    }
}
