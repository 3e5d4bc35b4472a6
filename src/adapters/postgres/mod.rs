//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Atomic subscription writes via database functions
//!
//! Schema and functions live in `migrations/`.

mod subscription_repository;

pub use subscription_repository::PostgresSubscriptionRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
