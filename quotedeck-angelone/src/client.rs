//! Angel One SmartAPI client
//!
//! Performs the TOTP login exchange and FULL-mode quote requests against
//! the brokerage REST API.

use crate::session::{SessionCache, SessionTokens};
use crate::totp;
use crate::types::{ApiEnvelope, LoginData, LoginRequest, QuoteData, QuoteRequest};
use async_trait::async_trait;
use quotedeck_core::{GatewayError, GatewayResult, Instrument, QuoteProvider, QuoteRecord};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL for the SmartAPI
const ANGEL_API_BASE: &str = "https://apiconnect.angelone.in";

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const QUOTE_PATH: &str = "/rest/secure/angelbroking/market/v1/quote/";

/// Per-call HTTP timeout; a timeout surfaces as a transport failure and
/// feeds the gateway's fallback path
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and connection settings for the SmartAPI
#[derive(Clone)]
pub struct AngelOneConfig {
    /// SmartAPI application key (X-PrivateKey header)
    pub api_key: String,
    /// Trading account client code
    pub client_code: String,
    /// Account PIN used as the login password
    pub pin: String,
    /// Base32 TOTP secret registered for the account
    pub totp_secret: String,
    /// Base URL override, mainly for pointing at a stub in integration setups
    pub base_url: Option<String>,
}

impl AngelOneConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let require = |key: &str| {
            std::env::var(key)
                .map_err(|_| GatewayError::config(format!("Missing environment variable {}", key)))
        };

        Ok(Self {
            api_key: require("ANGEL_API_KEY")?,
            client_code: require("ANGEL_CLIENT_CODE")?,
            pin: require("ANGEL_PIN")?,
            totp_secret: require("ANGEL_TOTP_SECRET")?,
            base_url: std::env::var("ANGEL_API_BASE").ok(),
        })
    }
}

impl std::fmt::Debug for AngelOneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of logs
        f.debug_struct("AngelOneConfig")
            .field("client_code", &self.client_code)
            .finish_non_exhaustive()
    }
}

/// SmartAPI client
pub struct AngelOneClient {
    client: Client,
    base_url: String,
    config: AngelOneConfig,
    session: SessionCache,
}

impl AngelOneClient {
    /// Create a new client
    pub fn new(config: AngelOneConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANGEL_API_BASE.to_string());

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            config,
            session: SessionCache::default(),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach the client-identification headers SmartAPI requires
    fn identify(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-UserType", "USER")
            .header("X-SourceID", "WEB")
            .header("X-ClientLocalIP", "127.0.0.1")
            .header("X-ClientPublicIP", "127.0.0.1")
            .header("X-MACAddress", "00:00:00:00:00:00")
            .header("X-PrivateKey", &self.config.api_key)
    }

    /// Perform the login exchange: client code + PIN + fresh one-time code
    async fn login(&self) -> GatewayResult<SessionTokens> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        let body = LoginRequest {
            clientcode: self.config.client_code.clone(),
            password: self.config.pin.clone(),
            totp: totp::current_code(&self.config.totp_secret)?,
        };

        debug!("Performing SmartAPI login exchange");

        let response = self
            .identify(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::transport(format!("Login request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::auth(format!(
                "Login rejected ({}): {}",
                status, text
            )));
        }

        let envelope: ApiEnvelope<LoginData> = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(format!("Failed to parse login response: {}", e)))?;

        if !envelope.status {
            return Err(GatewayError::auth(format!(
                "Login rejected ({}): {}",
                envelope.errorcode, envelope.message
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::parse("Login response missing token data"))?;

        Ok(SessionTokens {
            jwt: data.jwt_token,
            refresh_token: data.refresh_token,
            feed_token: data.feed_token,
        })
    }

    /// Fetch FULL-mode quotes for a set of instruments in one call
    ///
    /// Instruments are grouped by exchange into a single request body.
    /// Instruments the provider reports as unfetched are logged and simply
    /// absent from the result; the caller degrades them per symbol.
    pub async fn fetch_full_quotes(
        &self,
        instruments: &[&'static Instrument],
    ) -> GatewayResult<Vec<QuoteRecord>> {
        if instruments.is_empty() {
            return Ok(Vec::new());
        }

        let jwt = self.session.bearer_token(|| self.login()).await?;

        let exchange_tokens = batch_by_exchange(instruments);
        let url = format!("{}{}", self.base_url, QUOTE_PATH);

        debug!(
            "Fetching {} instrument(s) across {} exchange(s)",
            instruments.len(),
            exchange_tokens.len()
        );

        let response = self
            .identify(self.client.post(&url))
            .bearer_auth(&jwt)
            .json(&QuoteRequest::full(exchange_tokens))
            .send()
            .await
            .map_err(|e| GatewayError::transport(format!("Quote request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked server-side before its nominal expiry
            self.session.invalidate().await;
            return Err(GatewayError::auth("Quote request unauthorized"));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::api(format!(
                "SmartAPI error ({}): {}",
                status, text
            )));
        }

        let envelope: ApiEnvelope<QuoteData> = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(format!("Failed to parse quote response: {}", e)))?;

        if !envelope.status {
            return Err(GatewayError::api(format!(
                "SmartAPI error ({}): {}",
                envelope.errorcode, envelope.message
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::parse("Quote response missing data"))?;

        for unfetched in &data.unfetched {
            warn!(
                "Provider could not quote {}:{}: {}",
                unfetched.exchange, unfetched.symbol_token, unfetched.message
            );
        }

        let records = data
            .fetched
            .iter()
            .filter_map(|quote| {
                instruments
                    .iter()
                    .find(|inst| {
                        inst.token == quote.symbol_token
                            && inst.exchange.as_str() == quote.exchange
                    })
                    .map(|inst| quote.to_quote_record(inst.symbol))
            })
            .collect();

        Ok(records)
    }
}

/// Group instruments by exchange for a single multi-exchange request body
fn batch_by_exchange(instruments: &[&'static Instrument]) -> HashMap<&'static str, Vec<String>> {
    let mut exchange_tokens: HashMap<&'static str, Vec<String>> = HashMap::new();

    for inst in instruments {
        exchange_tokens
            .entry(inst.exchange.as_str())
            .or_default()
            .push(inst.token.to_string());
    }

    exchange_tokens
}

#[async_trait]
impl QuoteProvider for AngelOneClient {
    async fn fetch_quotes(
        &self,
        instruments: &[&'static Instrument],
    ) -> GatewayResult<Vec<QuoteRecord>> {
        self.fetch_full_quotes(instruments).await
    }
}

impl std::fmt::Debug for AngelOneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngelOneClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotedeck_core::lookup_instrument;

    #[test]
    fn batches_mixed_exchanges_into_one_request() {
        let instruments = vec![
            lookup_instrument("SENSEX").unwrap(),
            lookup_instrument("NIFTY50").unwrap(),
            lookup_instrument("RELIANCE").unwrap(),
        ];

        let exchange_tokens = batch_by_exchange(&instruments);

        assert_eq!(exchange_tokens.len(), 2);
        assert_eq!(exchange_tokens["BSE"], vec!["99919000".to_string()]);
        assert_eq!(exchange_tokens["NSE"].len(), 2);
        assert!(exchange_tokens["NSE"].contains(&"2885".to_string()));
    }

    #[test]
    fn debug_output_omits_credentials() {
        let config = AngelOneConfig {
            api_key: "secret-key".to_string(),
            client_code: "A123456".to_string(),
            pin: "0000".to_string(),
            totp_secret: "SECRETSECRET".to_string(),
            base_url: None,
        };
        let printed = format!("{:?}", config);
        assert!(printed.contains("A123456"));
        assert!(!printed.contains("secret-key"));
        assert!(!printed.contains("SECRETSECRET"));
    }
}
