//! Billing provider configuration (PayPal-compatible REST and webhook API)

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ValidationError;
use super::server::Environment;

const MAX_TOKEN_SAFETY_MARGIN_SECS: u64 = 3600;

/// Billing provider configuration
///
/// Credentials and the webhook id are optional at load time. A missing value
/// does not stop the process; webhook deliveries are answered with a server
/// error until it is configured.
#[derive(Debug, Deserialize)]
pub struct BillingConfig {
    /// Provider REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth client id
    pub client_id: Option<String>,

    /// OAuth client secret
    pub client_secret: Option<SecretString>,

    /// Webhook id registered with the provider, part of every canonical message
    pub webhook_id: Option<String>,

    /// Development-only switch that accepts webhooks without verification
    #[serde(default)]
    pub verification_bypass: bool,

    /// Domains allowed to host signing certificates (comma-separated)
    #[serde(default = "default_cert_domains")]
    pub cert_domains: String,

    /// Timeout for every outbound provider call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tokens are refreshed this many seconds before they expire
    #[serde(default = "default_token_safety_margin")]
    pub token_safety_margin_secs: u64,

    /// Base URL of the service exposing `POST /api/subscription/cancel`.
    /// When unset, compensation cancels directly against the provider.
    pub rollback_url: Option<String>,

    /// Upper bound for one compensation attempt, in seconds
    #[serde(default = "default_rollback_timeout")]
    pub rollback_timeout_secs: u64,
}

impl BillingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }

    pub fn rollback_timeout(&self) -> Duration {
        Duration::from_secs(self.rollback_timeout_secs)
    }

    /// Certificate domains as a normalized list
    pub fn cert_domain_list(&self) -> Vec<String> {
        self.cert_domains
            .split(',')
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Client id and secret, when both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        use secrecy::ExposeSecret;

        let id = self.client_id.as_deref().filter(|id| !id.is_empty())?;
        let secret = self
            .client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty())?;
        Some((id, secret))
    }

    /// Configured webhook id, when present and non-empty
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Validate billing configuration against the running environment
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        let production = environment == Environment::Production;

        if self.verification_bypass && production {
            return Err(ValidationError::VerificationBypassInProduction);
        }

        let api = Url::parse(&self.api_base_url).map_err(|_| ValidationError::InvalidUrl {
            field: "billing.api_base_url",
            value: self.api_base_url.clone(),
        })?;
        if production && api.scheme() != "https" {
            return Err(ValidationError::BillingApiMustBeHttps);
        }

        if let Some(rollback) = &self.rollback_url {
            Url::parse(rollback).map_err(|_| ValidationError::InvalidUrl {
                field: "billing.rollback_url",
                value: rollback.clone(),
            })?;
        }

        if self.cert_domain_list().is_empty() {
            return Err(ValidationError::NoCertDomains);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout("billing.request_timeout_secs"));
        }
        if self.rollback_timeout_secs == 0 || self.rollback_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout("billing.rollback_timeout_secs"));
        }
        if self.token_safety_margin_secs > MAX_TOKEN_SAFETY_MARGIN_SECS {
            return Err(ValidationError::TokenMarginTooLarge {
                max: MAX_TOKEN_SAFETY_MARGIN_SECS,
            });
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            client_id: None,
            client_secret: None,
            webhook_id: None,
            verification_bypass: false,
            cert_domains: default_cert_domains(),
            request_timeout_secs: default_request_timeout(),
            token_safety_margin_secs: default_token_safety_margin(),
            rollback_url: None,
            rollback_timeout_secs: default_rollback_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

fn default_cert_domains() -> String {
    "paypal.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_token_safety_margin() -> u64 {
    60
}

fn default_rollback_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> BillingConfig {
        BillingConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some(SecretString::new("client-secret".to_string())),
            webhook_id: Some("WH-123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn bypass_is_disabled_by_default() {
        let config = BillingConfig::default();
        assert!(!config.verification_bypass);
        assert_eq!(config.token_safety_margin(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn bypass_is_rejected_in_production() {
        let config = BillingConfig {
            verification_bypass: true,
            ..configured()
        };
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::VerificationBypassInProduction)
        );
        assert!(config.validate(Environment::Development).is_ok());
    }

    #[test]
    fn production_requires_https_api() {
        let config = BillingConfig {
            api_base_url: "http://localhost:9999".to_string(),
            ..configured()
        };
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::BillingApiMustBeHttps)
        );
        assert!(config.validate(Environment::Staging).is_ok());
    }

    #[test]
    fn oversized_token_margin_is_rejected() {
        let config = BillingConfig {
            token_safety_margin_secs: u64::MAX,
            ..configured()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::TokenMarginTooLarge { max: 3600 })
        );

        let at_limit = BillingConfig {
            token_safety_margin_secs: 3600,
            ..configured()
        };
        assert!(at_limit.validate(Environment::Development).is_ok());
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let config = BillingConfig {
            rollback_url: Some("not a url".to_string()),
            ..configured()
        };
        assert!(matches!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidUrl { field: "billing.rollback_url", .. })
        ));
    }

    #[test]
    fn cert_domains_are_normalized() {
        let config = BillingConfig {
            cert_domains: " PayPal.com, .paypalobjects.com ,".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.cert_domain_list(),
            vec!["paypal.com", "paypalobjects.com"]
        );

        let empty = BillingConfig {
            cert_domains: " , ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            empty.validate(Environment::Development),
            Err(ValidationError::NoCertDomains)
        );
    }

    #[test]
    fn credentials_require_both_halves() {
        assert!(configured().credentials().is_some());

        let missing_secret = BillingConfig {
            client_secret: None,
            ..configured()
        };
        assert!(missing_secret.credentials().is_none());

        let blank_id = BillingConfig {
            client_id: Some(String::new()),
            ..configured()
        };
        assert!(blank_id.credentials().is_none());
    }

    #[test]
    fn blank_webhook_id_counts_as_missing() {
        let config = BillingConfig {
            webhook_id: Some(String::new()),
            ..configured()
        };
        assert!(config.webhook_id().is_none());
        assert_eq!(configured().webhook_id(), Some("WH-123"));
    }
}
