//! Request and response bodies for the billing provider REST API.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// `POST /v1/oauth2/token` reply.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// OAuth error body, e.g. `{"error":"invalid_client","error_description":"..."}`.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// `POST /v1/notifications/verify-webhook-signature` body.
#[derive(Debug, Serialize)]
pub struct VerifySignatureRequest<'a> {
    pub auth_algo: &'a str,
    pub cert_url: &'a str,
    pub transmission_id: &'a str,
    pub transmission_sig: &'a str,
    pub transmission_time: &'a str,
    pub webhook_id: &'a str,
    /// Serialized verbatim; a re-encoded event would not match the signature.
    pub webhook_event: &'a RawValue,
}

/// Verification reply. Only `"SUCCESS"` counts as verified.
#[derive(Debug, Deserialize)]
pub struct VerifySignatureResponse {
    pub verification_status: String,
}

/// `POST /v1/billing/subscriptions/{id}/cancel` body.
#[derive(Debug, Serialize)]
pub struct CancelSubscriptionRequest<'a> {
    pub reason: &'a str,
}

/// Standard REST error body.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub debug_id: Option<String>,
}
