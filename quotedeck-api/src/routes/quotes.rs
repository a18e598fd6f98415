//! Quote endpoints
//!
//! Both endpoints always answer 200: the gateway substitutes flagged
//! fallback records for anything it cannot fetch live.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use quotedeck_core::{QuoteRecord, INSTRUMENTS};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

/// Query parameters for the batch quote endpoint
#[derive(Debug, Deserialize)]
pub struct QuotesQuery {
    /// Comma-separated symbols; defaults to the full instrument table
    pub symbols: Option<String>,
}

/// Response for the batch quote endpoint
#[derive(Debug, Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<QuoteRecord>,
    pub count: usize,
}

/// Create quote routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(list_quotes))
        .route("/quotes/{symbol}", get(get_quote))
}

/// Get a single quote by symbol
async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<QuoteRecord> {
    info!("Quote requested for {}", symbol);
    Json(state.market_data.get_quote(&symbol).await)
}

/// Get quotes for a list of symbols in one response
async fn list_quotes(
    State(state): State<AppState>,
    Query(params): Query<QuotesQuery>,
) -> Json<QuotesResponse> {
    let requested: Vec<String> = match &params.symbols {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => INSTRUMENTS.iter().map(|i| i.symbol.to_string()).collect(),
    };

    info!("Batch quotes requested for {:?}", requested);

    let symbols: Vec<&str> = requested.iter().map(String::as_str).collect();
    let quotes = state.market_data.get_quotes(&symbols).await;
    let count = quotes.len();

    Json(QuotesResponse { quotes, count })
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::offline_app;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use quotedeck_core::INSTRUMENTS;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = offline_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn single_quote_answers_200_with_flagged_fallback() {
        let (status, body) = get_json("/api/quotes/SENSEX").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "SENSEX");
        assert_eq!(body["is_fallback"], true);
    }

    #[tokio::test]
    async fn batch_quote_answers_one_record_per_symbol() {
        let (status, body) = get_json("/api/quotes?symbols=SENSEX,NIFTY50,DOGECOIN").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["quotes"][0]["symbol"], "SENSEX");
        assert_eq!(body["quotes"][2]["symbol"], "DOGECOIN");
    }

    #[tokio::test]
    async fn batch_without_symbols_serves_the_whole_table() {
        let (status, body) = get_json("/api/quotes").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], INSTRUMENTS.len());
    }
}
