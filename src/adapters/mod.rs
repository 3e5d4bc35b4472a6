//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - REST API (webhook receiver, subscription endpoints)
//! - `memory` - In-memory subscription store for tests and local runs
//! - `paypal` - Billing provider client, OAuth token cache, mock provider
//! - `postgres` - PostgreSQL subscription repository and migrations
//! - `rollback` - Compensators for orphaned provider subscriptions

pub mod http;
pub mod memory;
pub mod paypal;
pub mod postgres;
pub mod rollback;

use crate::ports::PaymentError;

/// Maps a reqwest transport failure to a retryable payment error.
pub(crate) fn transport_error(err: reqwest::Error) -> PaymentError {
    if err.is_timeout() {
        PaymentError::timeout(format!("Request timed out: {}", err))
    } else {
        PaymentError::network(format!("Request failed: {}", err))
    }
}
