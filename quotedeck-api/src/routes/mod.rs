//! API route definitions

mod forecast;
mod health;
mod quotes;

use crate::AppState;
use axum::Router;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(quotes::routes())
        .merge(forecast::routes())
        .merge(health::routes())
}
