//! Session token cache
//!
//! Holds the bearer credential from the login exchange and reuses it until
//! it approaches expiry. The cache is the exclusive owner of the tokens for
//! the life of the process; a refresh replaces the whole set.

use quotedeck_core::GatewayResult;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// How long a session token is treated as valid after issue
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Refresh this long before nominal expiry
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Token set returned by the login exchange
#[derive(Debug, Clone)]
pub struct SessionTokens {
    /// Bearer token presented on authenticated calls
    pub jwt: String,
    /// Opaque refresh token (unused by the gateway, kept for completeness)
    pub refresh_token: String,
    /// Feed token for the provider's streaming products
    pub feed_token: String,
}

#[derive(Debug)]
struct CachedSession {
    tokens: SessionTokens,
    expires_at: Instant,
}

/// Bearer-token cache with a fixed validity window and safety margin
///
/// A token is served only while `now < expires_at - safety_margin`; past
/// that point the next caller performs the login exchange. The mutex is
/// held across the exchange, so concurrent callers during a refresh
/// coalesce into a single login.
#[derive(Debug)]
pub struct SessionCache {
    inner: Mutex<Option<CachedSession>>,
    validity: Duration,
    safety_margin: Duration,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(TOKEN_VALIDITY, EXPIRY_SAFETY_MARGIN)
    }
}

impl SessionCache {
    pub fn new(validity: Duration, safety_margin: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            validity,
            safety_margin,
        }
    }

    /// Get a valid bearer token, performing the login exchange if needed
    ///
    /// `login` is only invoked on a cold cache or when the cached token is
    /// inside the safety margin. A failed exchange leaves the cache empty
    /// and propagates to the caller.
    pub async fn bearer_token<F, Fut>(&self, login: F) -> GatewayResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<SessionTokens>>,
    {
        let mut guard = self.inner.lock().await;

        if let Some(session) = guard.as_ref() {
            if Instant::now() + self.safety_margin < session.expires_at {
                debug!("Reusing cached session token");
                return Ok(session.tokens.jwt.clone());
            }
            debug!("Cached session token inside safety margin, refreshing");
            *guard = None;
        }

        let tokens = login().await?;
        let jwt = tokens.jwt.clone();
        *guard = Some(CachedSession {
            tokens,
            expires_at: Instant::now() + self.validity,
        });
        info!("Stored new session token (valid {:?})", self.validity);

        Ok(jwt)
    }

    /// Drop the cached token so the next caller logs in again
    ///
    /// Used when the provider rejects a request as unauthorized despite the
    /// token being nominally valid.
    pub async fn invalidate(&self) {
        let mut guard = self.inner.lock().await;
        if guard.take().is_some() {
            info!("Invalidated cached session token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotedeck_core::GatewayError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tokens(n: usize) -> SessionTokens {
        SessionTokens {
            jwt: format!("jwt-{}", n),
            refresh_token: "refresh".to_string(),
            feed_token: "feed".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_reuse_one_login() {
        let cache = SessionCache::default();
        let logins = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let logins = Arc::clone(&logins);
            let jwt = cache
                .bearer_token(|| async move {
                    let n = logins.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(tokens(n))
                })
                .await
                .unwrap();
            assert_eq!(jwt, "jwt-1");
        }

        assert_eq!(logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_inside_safety_margin() {
        let cache = SessionCache::default();
        let logins = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&logins);
        let jwt = cache
            .bearer_token(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(tokens(n))
            })
            .await
            .unwrap();
        assert_eq!(jwt, "jwt-1");

        // 56 minutes in: 4 minutes to expiry, inside the 5 minute margin
        tokio::time::advance(Duration::from_secs(56 * 60)).await;

        let counter = Arc::clone(&logins);
        let jwt = cache
            .bearer_token(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(tokens(n))
            })
            .await
            .unwrap();
        assert_eq!(jwt, "jwt-2");
        assert_eq!(logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_login_is_not_cached() {
        let cache = SessionCache::default();

        let err = cache
            .bearer_token(|| async { Err(GatewayError::auth("rejected")) })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));

        // Next caller retries the exchange
        let jwt = cache
            .bearer_token(|| async { Ok(tokens(1)) })
            .await
            .unwrap();
        assert_eq!(jwt, "jwt-1");
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_relogin() {
        let cache = SessionCache::default();
        let logins = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let logins = Arc::clone(&logins);
            cache
                .bearer_token(|| async move {
                    logins.fetch_add(1, Ordering::SeqCst);
                    Ok(tokens(1))
                })
                .await
                .unwrap();
        }
        assert_eq!(logins.load(Ordering::SeqCst), 1);

        cache.invalidate().await;

        let logins2 = Arc::clone(&logins);
        cache
            .bearer_token(|| async move {
                logins2.fetch_add(1, Ordering::SeqCst);
                Ok(tokens(2))
            })
            .await
            .unwrap();
        assert_eq!(logins.load(Ordering::SeqCst), 2);
    }
}
