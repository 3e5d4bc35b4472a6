//! Foundation module - Shared domain primitives.
//!
//! Identifiers, time, the state machine trait and error types used across
//! the subscription domain.

mod clock;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ProviderPlanId, ProviderSubscriptionId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
