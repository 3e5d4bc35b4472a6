//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `SUBSCRIPTION_SYNC`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use subscription_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod database;
mod error;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Billing provider configuration
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_SYNC__BILLING__WEBHOOK_ID=...` -> `billing.webhook_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid,
    /// including a verification bypass requested in production.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.billing.validate(self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "SUBSCRIPTION_SYNC__DATABASE__URL",
            "postgresql://test@localhost/test",
        );
    }

    fn clear_env() {
        for key in [
            "SUBSCRIPTION_SYNC__DATABASE__URL",
            "SUBSCRIPTION_SYNC__SERVER__PORT",
            "SUBSCRIPTION_SYNC__SERVER__ENVIRONMENT",
            "SUBSCRIPTION_SYNC__BILLING__WEBHOOK_ID",
            "SUBSCRIPTION_SYNC__BILLING__VERIFICATION_BYPASS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_minimal_environment_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert!(!config.billing.verification_bypass);
        assert!(config.billing.webhook_id().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_nested_billing_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__BILLING__WEBHOOK_ID", "WH-42");
        env::set_var("SUBSCRIPTION_SYNC__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.billing.webhook_id(), Some("WH-42"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn bypass_in_production_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__SERVER__ENVIRONMENT", "production");
        env::set_var("SUBSCRIPTION_SYNC__BILLING__VERIFICATION_BYPASS", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::VerificationBypassInProduction)
        );
    }
}
