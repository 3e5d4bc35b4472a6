//! Compensators for orphaned provider subscriptions.
//!
//! - `HttpRollbackClient` - Calls the service's own cancellation endpoint
//! - `ProviderCompensator` - Cancels directly through the billing provider

mod http_rollback_client;
mod provider_compensator;

pub use http_rollback_client::{HttpRollbackClient, USER_ID_HEADER};
pub use provider_compensator::ProviderCompensator;
