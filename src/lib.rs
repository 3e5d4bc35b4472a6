//! Subscription Sync - Keeps internal subscription records in step with a
//! recurring-billing provider.
//!
//! Verified provider webhooks drive a small subscription state machine, and
//! client-initiated creation runs as a saga that cancels the provider
//! subscription when the internal write fails.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
