//! OAuth client-credentials exchange against `/v1/oauth2/token`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::adapters::transport_error;
use crate::ports::{IssuedToken, PaymentError, PaymentErrorCode, TokenIssuer};

use super::wire_types::{OAuthErrorResponse, TokenResponse};

/// Exchanges client credentials for a bearer token.
pub struct PayPalOAuthClient {
    http_client: reqwest::Client,
    api_base_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl PayPalOAuthClient {
    pub fn new(
        http_client: reqwest::Client,
        api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret,
        }
    }
}

#[async_trait]
impl TokenIssuer for PayPalOAuthClient {
    async fn issue_token(&self) -> Result<IssuedToken, PaymentError> {
        let url = format!("{}/v1/oauth2/token", self.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body: OAuthErrorResponse = response.json().await.unwrap_or_default();
            let detail = body
                .error_description
                .or(body.error.clone())
                .unwrap_or_else(|| status.to_string());
            tracing::error!(status = %status, error = %detail, "Token exchange failed");

            let err = match status {
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    PaymentError::authentication(format!("Credentials rejected: {}", detail))
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    PaymentError::new(PaymentErrorCode::RateLimitExceeded, detail)
                }
                _ => PaymentError::provider(format!("Token endpoint error: {}", detail)),
            };
            return Err(match body.error {
                Some(code) => err.with_provider_code(code),
                None => err,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse token response: {}", e))
        })?;

        Ok(IssuedToken {
            access_token: SecretString::new(token.access_token),
            expires_in_secs: token.expires_in,
        })
    }
}
