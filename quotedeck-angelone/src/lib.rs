//! Angel One SmartAPI integration for the Quotedeck gateway
//!
//! This crate provides a client for the brokerage's REST API: the TOTP
//! login exchange, a bearer-token cache with expiry, and the FULL-mode
//! quote endpoint normalized into gateway records.

pub mod client;
pub mod session;
pub mod totp;
pub mod types;

pub use client::{AngelOneClient, AngelOneConfig};
pub use session::{SessionCache, SessionTokens};
