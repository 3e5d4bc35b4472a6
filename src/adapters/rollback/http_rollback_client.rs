//! Rollback through the cancellation endpoint.

use async_trait::async_trait;
use serde::Serialize;

use crate::adapters::transport_error;
use crate::ports::{CompensationRequest, PaymentError, SubscriptionCompensator};

/// Header carrying the caller identity on internal calls.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
struct CancelRequestBody<'a> {
    provider_subscription_id: &'a str,
    reason: &'a str,
}

/// Posts `{provider_subscription_id, reason}` to `{base_url}/api/subscription/cancel`.
pub struct HttpRollbackClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRollbackClient {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/subscription/cancel", self.base_url)
    }
}

#[async_trait]
impl SubscriptionCompensator for HttpRollbackClient {
    async fn cancel_orphaned(&self, request: &CompensationRequest) -> Result<(), PaymentError> {
        let body = CancelRequestBody {
            provider_subscription_id: request.provider_subscription_id.as_str(),
            reason: &request.reason,
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .header(USER_ID_HEADER, request.user_id.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentError::provider(format!(
                "Rollback endpoint returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
