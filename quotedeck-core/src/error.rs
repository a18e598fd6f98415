//! Error types for the gateway

use thiserror::Error;

/// Gateway-wide error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn auth(msg: impl Into<String>) -> Self {
        GatewayError::Auth(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        GatewayError::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        GatewayError::Parse(msg.into())
    }

    pub fn unknown_symbol(msg: impl Into<String>) -> Self {
        GatewayError::UnknownSymbol(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        GatewayError::Api(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GatewayError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GatewayError::Internal(msg.into())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
