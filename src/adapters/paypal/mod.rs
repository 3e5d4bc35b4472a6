//! Billing provider adapter for the PayPal REST API.
//!
//! Implements the `BillingProvider` port, including:
//! - OAuth client-credentials exchange with a cached bearer token
//! - Webhook signature verification via the provider's verification endpoint
//! - Subscription cancellation
//!
//! # Security
//!
//! - Client secret and bearer tokens are handled via `secrecy::SecretString`
//! - Verification fails closed on any non-`SUCCESS` status
//!
//! # Configuration
//!
//! Environment variables:
//! - `SUBSCRIPTION_SYNC__BILLING__CLIENT_ID`
//! - `SUBSCRIPTION_SYNC__BILLING__CLIENT_SECRET`
//! - `SUBSCRIPTION_SYNC__BILLING__WEBHOOK_ID`

mod mock_billing_provider;
mod oauth_client;
mod paypal_adapter;
mod token_cache;
mod wire_types;

pub use mock_billing_provider::{CancelMode, MethodCall, MockBillingProvider, VerifyMode};
pub use oauth_client::PayPalOAuthClient;
pub use paypal_adapter::PayPalBillingAdapter;
pub use token_cache::AccessTokenCache;
