//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::rollback::USER_ID_HEADER;
use crate::application::handlers::subscription::{
    ApplySubscriptionEventHandler, CancelSubscriptionCommand, CancelSubscriptionHandler,
    CreateSubscriptionCommand, CreateSubscriptionHandler, GetSubscriptionHandler,
    GetSubscriptionQuery, HandleProviderWebhookCommand, HandleProviderWebhookHandler,
    SubscriptionRollbackCoordinator, WebhookVerifier,
};
use crate::domain::foundation::{
    Clock, DomainError, ProviderPlanId, ProviderSubscriptionId, UserId, ValidationError,
};
use crate::domain::subscription::{SubscriptionError, WebhookError};
use crate::ports::{BillingProvider, SubscriptionRepository};

use super::dto::{
    ActivateSubscriptionRequest, ActivateSubscriptionResponse, CancelSubscriptionRequest,
    CancelSubscriptionResponse, ErrorResponse, SubscriptionResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for subscription routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub billing_provider: Arc<dyn BillingProvider>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub rollback: Arc<SubscriptionRollbackCoordinator>,
    pub clock: Arc<dyn Clock>,
}

impl SubscriptionAppState {
    pub fn webhook_handler(&self) -> HandleProviderWebhookHandler {
        HandleProviderWebhookHandler::new(
            self.webhook_verifier.clone(),
            Arc::new(ApplySubscriptionEventHandler::new(
                self.repository.clone(),
                self.clock.clone(),
            )),
        )
    }

    pub fn create_subscription_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(self.repository.clone(), self.rollback.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.repository.clone(), self.billing_provider.clone())
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.repository.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity taken from the `X-User-Id` header.
///
/// Session handling lives in front of this service; the header is set by
/// the trusted gateway and by the rollback client.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s.trim()).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Ingress
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/paypal - Handle billing provider webhooks
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_paypal_webhook(
    State(state): State<SubscriptionAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let handler = state.webhook_handler();
    let cmd = HandleProviderWebhookCommand {
        headers,
        body: body.to_vec(),
    };

    match handler.handle(cmd).await {
        Ok(_) => ack(),
        Err(err) => webhook_error_response(err),
    }
}

fn ack() -> Response {
    (StatusCode::OK, Json(WebhookAckResponse { received: true })).into_response()
}

fn webhook_error_response(err: WebhookError) -> Response {
    let status = err.status_code();
    if err.is_authenticity_failure() {
        tracing::warn!(error = %err, "Rejected unauthenticated webhook");
    } else if err.is_retryable() {
        tracing::error!(error = %err, "Webhook processing failed; provider will redeliver");
    } else {
        tracing::warn!(error = %err, "Rejected malformed webhook");
    }

    let error_code = match &err {
        WebhookError::MissingHeader(_)
        | WebhookError::UntrustedCertUrl(_)
        | WebhookError::VerificationFailed(_) => "WEBHOOK_VERIFICATION_FAILED",
        WebhookError::MissingField(_) => "INVALID_WEBHOOK_PAYLOAD",
        WebhookError::MissingConfiguration(_) => "CONFIGURATION_MISSING",
        WebhookError::SubscriptionNotFound(_) => "SUBSCRIPTION_NOT_FOUND",
        WebhookError::Database(_) => "DATABASE_ERROR",
    };

    (status, Json(ErrorResponse::new(error_code, err.to_string()))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscription/activate - Record a provider-approved subscription
pub async fn activate_subscription(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Json(request): Json<ActivateSubscriptionRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let handler = state.create_subscription_handler();
    let cmd = CreateSubscriptionCommand {
        user_id: user.user_id,
        provider_subscription_id: ProviderSubscriptionId::new(request.provider_subscription_id)?,
        provider_plan_id: ProviderPlanId::new(request.provider_plan_id)?,
        initial_status: request.initial_status,
    };

    let result = handler.handle(cmd).await?;

    let response = ActivateSubscriptionResponse {
        subscription_id: result.subscription_id.to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/subscription/cancel - Cancel a subscription
///
/// Also called by the rollback client for subscriptions with no local row.
pub async fn cancel_subscription(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let handler = state.cancel_subscription_handler();
    let cmd = CancelSubscriptionCommand {
        user_id: user.user_id,
        provider_subscription_id: ProviderSubscriptionId::new(request.provider_subscription_id)?,
        reason: request.reason,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CancelSubscriptionResponse {
        cancelled: true,
        local_record: result.local_record,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscription/:provider_subscription_id - Get the caller's subscription
pub async fn get_subscription(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Path(provider_subscription_id): Path<String>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let handler = state.get_subscription_handler();
    let query = GetSubscriptionQuery {
        user_id: user.user_id,
        provider_subscription_id: ProviderSubscriptionId::new(provider_subscription_id)?,
    };

    let subscription = handler.handle(query).await?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(SubscriptionError);

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for SubscriptionApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<DomainError> for SubscriptionApiError {
    fn from(err: DomainError) -> Self {
        Self(err.into())
    }
}

impl SubscriptionApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SubscriptionError::Authenticity(_) => StatusCode::UNAUTHORIZED,
            SubscriptionError::UserNotFound(_) | SubscriptionError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::Conflict(_) => StatusCode::CONFLICT,
            SubscriptionError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            SubscriptionError::TransientNetwork(_) | SubscriptionError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
            SubscriptionError::Configuration(_) | SubscriptionError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Subscription request failed");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
