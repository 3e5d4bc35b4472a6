//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing Provider Ports
//!
//! - `BillingProvider` - Webhook signature verification and cancellation
//! - `TokenIssuer` - OAuth client-credentials exchange
//! - `AccessTokenProvider` - Cached bearer tokens
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Atomic subscription writes and keyed updates
//!
//! ## Saga Ports
//!
//! - `SubscriptionCompensator` - Best-effort cancellation of orphaned provider subscriptions

mod access_token;
mod billing_provider;
mod subscription_compensator;
mod subscription_repository;

pub use access_token::{AccessTokenProvider, IssuedToken, TokenIssuer};
pub use billing_provider::{
    BillingProvider, CancellationOutcome, PaymentError, PaymentErrorCode,
    SignatureVerificationRequest, VerificationStatus,
};
pub use subscription_compensator::{CompensationRequest, SubscriptionCompensator};
pub use subscription_repository::{NewSubscription, SubscriptionRepository};
