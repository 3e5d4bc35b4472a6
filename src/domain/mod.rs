//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, clock, errors)
//! - `subscription` - Subscription lifecycle, provider events and webhook authenticity

pub mod foundation;
pub mod subscription;
