//! Process-wide bearer token cache.
//!
//! Holds at most one token. A cached token is handed out only while
//! `now < expires_at - safety_margin`; otherwise a fresh one is issued first.
//! Concurrent refreshes are not deduplicated: both callers exchange
//! credentials and the last write wins, which is wasteful but correct.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::domain::foundation::{Clock, Timestamp};
use crate::ports::{AccessTokenProvider, PaymentError, TokenIssuer};

struct CachedToken {
    value: SecretString,
    expires_at: Timestamp,
}

impl CachedToken {
    fn is_usable(&self, now: Timestamp, safety_margin_secs: i64) -> bool {
        now.is_before(&self.expires_at.minus_secs(safety_margin_secs))
    }
}

/// Caches the token produced by a [`TokenIssuer`].
pub struct AccessTokenCache {
    issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    safety_margin_secs: i64,
    cached: RwLock<Option<CachedToken>>,
}

impl AccessTokenCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>, clock: Arc<dyn Clock>, safety_margin: Duration) -> Self {
        Self {
            issuer,
            clock,
            safety_margin_secs: i64::try_from(safety_margin.as_secs()).unwrap_or(i64::MAX),
            cached: RwLock::new(None),
        }
    }

    #[cfg(test)]
    async fn cached_expiry(&self) -> Option<Timestamp> {
        self.cached.read().await.as_ref().map(|t| t.expires_at)
    }
}

#[async_trait]
impl AccessTokenProvider for AccessTokenCache {
    async fn access_token(&self) -> Result<SecretString, PaymentError> {
        let requested_at = self.clock.now();

        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_usable(requested_at, self.safety_margin_secs) {
                    return Ok(SecretString::new(token.value.expose_secret().clone()));
                }
            }
        }

        // Failure leaves the previous entry in place.
        let issued = self.issuer.issue_token().await?;

        // Expiry counts from before the exchange so it never overshoots.
        let expires_at = requested_at.plus_secs(issued.expires_in_secs.max(0));
        let value = issued.access_token.expose_secret().clone();

        *self.cached.write().await = Some(CachedToken {
            value: issued.access_token,
            expires_at,
        });

        tracing::debug!(
            expires_at = %expires_at.as_datetime(),
            "Billing provider access token refreshed"
        );

        Ok(SecretString::new(value))
    }

    async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
