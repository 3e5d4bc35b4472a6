//! Bearer token ports.
//!
//! `TokenIssuer` performs the OAuth client-credentials exchange;
//! `AccessTokenProvider` hands out a currently valid token, caching as it
//! sees fit.

use async_trait::async_trait;
use secrecy::SecretString;

use super::PaymentError;

/// Token returned by a client-credentials exchange.
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: SecretString,
    /// Lifetime reported by the provider, in seconds.
    pub expires_in_secs: i64,
}

/// Performs the OAuth client-credentials exchange.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// # Errors
    ///
    /// - `AuthenticationError` when the credentials are rejected
    /// - `NetworkError` / `Timeout` when the exchange cannot complete
    async fn issue_token(&self) -> Result<IssuedToken, PaymentError>;
}

/// Supplies a bearer token valid for at least the safety margin.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, PaymentError>;

    /// Drops any cached token, e.g. after the provider rejected it.
    async fn invalidate(&self) {}
}
