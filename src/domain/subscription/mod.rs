//! Subscription domain module.
//!
//! Keeps the internal subscription record in step with the billing provider.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription entity and keyed update semantics
//! - `status` - SubscriptionStatus state machine
//! - `event_type` - Provider webhook event types
//! - `transition` - Event-to-status mapping
//! - `webhook_verifier` - Transmission headers, certificate policy, canonical message
//! - `webhook_errors` - Webhook error types with HTTP status mapping

mod aggregate;
mod errors;
mod event_type;
mod status;
mod transition;
pub mod webhook_errors;
pub mod webhook_verifier;

pub use aggregate::{ApplyOutcome, Subscription};
pub use errors::SubscriptionError;
pub use event_type::ProviderEventType;
pub use status::SubscriptionStatus;
pub use transition::{EventEffect, FieldWrite, StatusUpdate};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{CanonicalMessage, CertUrlPolicy, TransmissionHeaders};
