//! Time-based one-time codes for the login exchange
//!
//! The brokerage's loginByPassword endpoint requires a fresh TOTP code
//! alongside the client code and PIN: standard algorithm, SHA1, 6 digits,
//! 30-second window.

use quotedeck_core::{GatewayError, GatewayResult};
use totp_rs::{Algorithm, Secret, TOTP};

const TOTP_ALGORITHM: Algorithm = Algorithm::SHA1;
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;

/// Build a TOTP instance from the base32-encoded secret
fn build_totp(secret: &str) -> GatewayResult<TOTP> {
    let secret = Secret::Encoded(secret.trim().to_uppercase())
        .to_bytes()
        .map_err(|e| GatewayError::config(format!("Invalid TOTP secret: {}", e)))?;

    TOTP::new(
        TOTP_ALGORITHM,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret,
        Some("AngelOne".to_string()),
        "quotedeck".to_string(),
    )
    .map_err(|e| GatewayError::config(format!("Failed to create TOTP: {}", e)))
}

/// Generate the current one-time code for the configured secret
pub fn current_code(secret: &str) -> GatewayResult<String> {
    let totp = build_totp(secret)?;
    totp.generate_current()
        .map_err(|e| GatewayError::internal(format!("System time error: {}", e)))
}
