//! Forecast endpoints
//!
//! Mock price forecasts seeded from the gateway's current quote: a random
//! walk with 2% daily volatility and confidence decaying over the horizon.
//! The model catalog is a static table; no model is actually trained.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use quotedeck_core::{lookup_instrument, INSTRUMENTS};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

/// Longest forecast horizon accepted, in days
const MAX_FORECAST_DAYS: u32 = 90;

/// A forecasting model in the catalog
#[derive(Debug, Serialize)]
pub struct ForecastModel {
    pub name: &'static str,
    pub accuracy: f64,
    pub last_trained: &'static str,
}

/// Available model catalog
pub const MODELS: &[ForecastModel] = &[
    ForecastModel {
        name: "LSTM",
        accuracy: 0.85,
        last_trained: "2024-01-15T10:30:00Z",
    },
    ForecastModel {
        name: "CNN_LSTM",
        accuracy: 0.82,
        last_trained: "2024-01-15T10:30:00Z",
    },
    ForecastModel {
        name: "ARIMA",
        accuracy: 0.78,
        last_trained: "2024-01-15T10:30:00Z",
    },
    ForecastModel {
        name: "SARIMA",
        accuracy: 0.80,
        last_trained: "2024-01-15T10:30:00Z",
    },
    ForecastModel {
        name: "ARCH_GARCH",
        accuracy: 0.75,
        last_trained: "2024-01-15T10:30:00Z",
    },
];

fn lookup_model(name: &str) -> Option<&'static ForecastModel> {
    MODELS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

/// Body for the forecast endpoint
#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub symbol: String,
    /// Defaults to LSTM
    pub model: Option<String>,
    /// Defaults to 30
    pub days: Option<u32>,
}

/// One forecasted day
#[derive(Debug, Serialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub predicted_price: Decimal,
    pub confidence: f64,
    pub upper_bound: Decimal,
    pub lower_bound: Decimal,
}

/// Response for the forecast endpoint
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub symbol: String,
    pub model: String,
    pub forecast_period: String,
    pub model_accuracy: f64,
    pub generated_at: DateTime<Utc>,
    pub forecast: Vec<ForecastPoint>,
}

/// Response for the model catalog endpoint
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: &'static [ForecastModel],
    pub count: usize,
    pub supported_symbols: Vec<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create forecast routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/forecast", post(generate_forecast))
        .route("/models", get(list_models))
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

/// Generate a mock forecast for a known symbol
async fn generate_forecast(
    State(state): State<AppState>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<ForecastResponse>, (StatusCode, Json<ErrorResponse>)> {
    let inst = lookup_instrument(&req.symbol).ok_or_else(|| {
        bad_request(format!(
            "Symbol '{}' not supported. Available: {}",
            req.symbol,
            INSTRUMENTS
                .iter()
                .map(|i| i.symbol)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let model_name = req.model.as_deref().unwrap_or("LSTM");
    let model = lookup_model(model_name).ok_or_else(|| {
        bad_request(format!(
            "Model '{}' not available. Available: {}",
            model_name,
            MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
        ))
    })?;

    let days = req.days.unwrap_or(30);
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(bad_request(format!(
            "days must be between 1 and {}",
            MAX_FORECAST_DAYS
        )));
    }

    info!(
        "Generating {}-day {} forecast for {}",
        days, model.name, inst.symbol
    );

    // Seed the walk from the gateway's view of the price (live or fallback)
    let quote = state.market_data.get_quote(inst.symbol).await;
    let forecast = mock_forecast(quote.price, days);

    Ok(Json(ForecastResponse {
        symbol: inst.symbol.to_string(),
        model: model.name.to_string(),
        forecast_period: format!("{} days", days),
        model_accuracy: model.accuracy,
        generated_at: Utc::now(),
        forecast,
    }))
}

/// List the model catalog
async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: MODELS,
        count: MODELS.len(),
        supported_symbols: INSTRUMENTS.iter().map(|i| i.symbol).collect(),
    })
}

/// Random walk from the base price with 2% daily volatility and a ±5% band
fn mock_forecast(base_price: Decimal, days: u32) -> Vec<ForecastPoint> {
    let mut rng = rand::rng();
    let mut base = base_price.to_f64().unwrap_or(1000.0);
    let now = Utc::now();

    (1..=days)
        .map(|i| {
            let change: f64 = rng.random_range(-0.02..0.02);
            let predicted = base * (1.0 + change);
            base = predicted;

            // Confidence decays with the horizon, floored at 0.6
            let confidence = (0.95 - (i - 1) as f64 * 0.01).max(0.6);

            ForecastPoint {
                date: now + Duration::days(i as i64),
                predicted_price: to_price(predicted),
                confidence: (confidence * 1000.0).round() / 1000.0,
                upper_bound: to_price(predicted * 1.05),
                lower_bound: to_price(predicted * 0.95),
            }
        })
        .collect()
}

fn to_price(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default().round_dp(2)
}
