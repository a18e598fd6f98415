//! Quotedeck API Server
//!
//! HTTP API server exposing the market-data gateway over the Angel One
//! SmartAPI brokerage backend.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use quotedeck_angelone::{AngelOneClient, AngelOneConfig};
use quotedeck_services::MarketDataService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Symbols kept warm in the cache from startup
const WARM_SYMBOLS: &[&str] = &["SENSEX", "NIFTY50", "BANKNIFTY"];

/// Refresh period for the warm symbols
const WARM_REFRESH_PERIOD: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<MarketDataService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quotedeck_api=debug")),
        )
        .init();

    info!("Starting Quotedeck API");

    // Initialize the brokerage client and gateway
    let config = AngelOneConfig::from_env()?;
    let client = Arc::new(AngelOneClient::new(config));
    let market_data = Arc::new(MarketDataService::with_defaults(client));

    // Keep the headline indices warm so dashboard loads hit the cache
    for symbol in WARM_SYMBOLS {
        market_data.start_auto_refresh(symbol, WARM_REFRESH_PERIOD, |update| {
            if let Some(error) = &update.error {
                warn!(
                    "Background refresh for {} degraded: {}",
                    update.record.symbol, error
                );
            }
        });
    }
    info!(
        "Warming cache for {:?} every {:?}",
        WARM_SYMBOLS, WARM_REFRESH_PERIOD
    );

    // Create app state
    let state = AppState { market_data };

    // Configure CORS for the dashboard frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state.clone());

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.market_data.stop_all_auto_refresh();
    info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
