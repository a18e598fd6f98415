//! Core types for the Quotedeck market-data gateway
//!
//! This crate defines the shared data structures used across the gateway,
//! including quote representations, the static instrument table, and the
//! provider abstraction.

pub mod error;
pub mod instrument;
pub mod provider;
pub mod quote;

pub use error::{GatewayError, GatewayResult};
pub use instrument::{fallback_quote, lookup_instrument, Exchange, Instrument, INSTRUMENTS};
pub use provider::QuoteProvider;
pub use quote::{QuoteRecord, QuoteUpdate};
