//! Mock billing provider for testing.
//!
//! Provides a configurable implementation of `BillingProvider` for unit and
//! integration tests. Supports:
//! - Signature verification modes, including a real HMAC over the canonical message
//! - Cancellation outcomes and error injection
//! - Call tracking

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::ProviderSubscriptionId;
use crate::domain::subscription::{CanonicalMessage, TransmissionHeaders};
use crate::ports::{
    BillingProvider, CancellationOutcome, PaymentError, SignatureVerificationRequest,
    VerificationStatus,
};

type HmacSha256 = Hmac<Sha256>;

/// Mock billing provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockBillingProvider::with_signing_secret("whsec");
/// let sig = MockBillingProvider::sign("whsec", canonical.as_str());
/// // send a webhook carrying `sig` in the transmission signature header
/// assert_eq!(mock.call_count("verify_webhook_signature"), 1);
/// ```
#[derive(Clone)]
pub struct MockBillingProvider {
    inner: Arc<Mutex<MockState>>,
}

struct MockState {
    configured: bool,
    verify_mode: VerifyMode,
    cancel_mode: CancelMode,
    /// Applied before every call.
    delay: Option<Duration>,
    call_log: Vec<MethodCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            configured: true,
            verify_mode: VerifyMode::default(),
            cancel_mode: CancelMode::default(),
            delay: None,
            call_log: Vec::new(),
        }
    }
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// How signature verification behaves.
#[derive(Debug, Default, Clone)]
pub enum VerifyMode {
    /// Every signature verifies.
    #[default]
    AcceptAll,

    /// Every signature fails with the given provider status.
    RejectAll(String),

    /// The signature must be the hex HMAC-SHA256 of the canonical message.
    HmacSecret(String),

    /// Verification cannot reach the provider.
    NetworkFailure,

    /// Verification exceeds its time budget.
    Timeout,
}

/// How cancellation behaves.
#[derive(Debug, Default, Clone)]
pub enum CancelMode {
    #[default]
    Cancel,
    AlreadyInactive,
    Fail(PaymentError),
}

impl Default for MockBillingProvider {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that checks signatures against `secret`.
    pub fn with_signing_secret(secret: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.set_verify_mode(VerifyMode::HmacSecret(secret.into()));
        mock
    }

    /// Mock that reports missing credentials.
    pub fn unconfigured() -> Self {
        let mock = Self::new();
        mock.state().configured = false;
        mock
    }

    /// Hex HMAC-SHA256 of `message` under `secret`.
    pub fn sign(secret: &str, message: &str) -> String {
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signature a real delivery would carry for `raw_body`.
    pub fn sign_delivery(
        secret: &str,
        transmission_id: &str,
        transmission_time: &str,
        webhook_id: &str,
        raw_body: &[u8],
    ) -> String {
        let headers = TransmissionHeaders {
            transmission_id: transmission_id.to_string(),
            transmission_time: transmission_time.to_string(),
            transmission_sig: String::new(),
            cert_url: String::new(),
            auth_algo: String::new(),
        };
        Self::sign(secret, CanonicalMessage::new(&headers, webhook_id, raw_body).as_str())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_verify_mode(&self, mode: VerifyMode) {
        self.state().verify_mode = mode;
    }

    pub fn set_cancel_mode(&self, mode: CancelMode) {
        self.state().cancel_mode = mode;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    fn record_call(&self, method: &str, args: Vec<String>) -> Option<Duration> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        state.delay
    }

    fn check_signature(secret: &str, request: &SignatureVerificationRequest) -> VerificationStatus {
        let expected = Self::sign(secret, request.canonical_message.as_str());
        let provided = request.headers.transmission_sig.as_bytes();

        if expected.as_bytes().ct_eq(provided).unwrap_u8() == 1 {
            VerificationStatus::Success
        } else {
            VerificationStatus::Failure("FAILURE".to_string())
        }
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn verify_webhook_signature(
        &self,
        request: &SignatureVerificationRequest,
    ) -> Result<VerificationStatus, PaymentError> {
        let delay = self.record_call(
            "verify_webhook_signature",
            vec![
                request.headers.transmission_id.clone(),
                request.webhook_id.clone(),
                request.webhook_event.get().to_string(),
            ],
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (configured, mode) = {
            let state = self.state();
            (state.configured, state.verify_mode.clone())
        };
        if !configured {
            return Err(PaymentError::not_configured("Billing provider client credentials"));
        }

        match mode {
            VerifyMode::AcceptAll => Ok(VerificationStatus::Success),
            VerifyMode::RejectAll(status) => Ok(VerificationStatus::Failure(status)),
            VerifyMode::HmacSecret(secret) => Ok(Self::check_signature(&secret, request)),
            VerifyMode::NetworkFailure => Err(PaymentError::network("connection refused")),
            VerifyMode::Timeout => Err(PaymentError::timeout("operation timed out")),
        }
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<CancellationOutcome, PaymentError> {
        let delay = self.record_call(
            "cancel_subscription",
            vec![provider_subscription_id.to_string(), reason.to_string()],
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (configured, mode) = {
            let state = self.state();
            (state.configured, state.cancel_mode.clone())
        };
        if !configured {
            return Err(PaymentError::not_configured("Billing provider client credentials"));
        }

        match mode {
            CancelMode::Cancel => Ok(CancellationOutcome::Cancelled),
            CancelMode::AlreadyInactive => Ok(CancellationOutcome::AlreadyInactive),
            CancelMode::Fail(err) => Err(err),
        }
    }

    fn is_configured(&self) -> bool {
        self.state().configured
    }
}
