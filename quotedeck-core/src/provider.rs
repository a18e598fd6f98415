//! Provider abstraction
//!
//! The gateway talks to the upstream brokerage through this seam so the
//! service layer can be exercised against a stub.

use crate::error::GatewayResult;
use crate::instrument::Instrument;
use crate::quote::QuoteRecord;
use async_trait::async_trait;

/// Source of live quote data
///
/// Implementations are expected to batch the requested instruments into as
/// few upstream calls as possible (one per call for the HTTP provider, which
/// groups tokens by exchange server-side) and to return one normalized record
/// per instrument the provider actually answered for. Missing instruments
/// are not an error; the caller degrades them individually.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch live quotes for the given instruments
    async fn fetch_quotes(
        &self,
        instruments: &[&'static Instrument],
    ) -> GatewayResult<Vec<QuoteRecord>>;
}
