//! Provider webhook authenticity primitives.
//!
//! The provider signs each delivery with a certificate it hosts and sends the
//! signature material in five transmission headers. This module extracts and
//! checks that material locally; confirming the signature itself is delegated
//! to the provider's verification endpoint by the application layer.
//!
//! Local checks, in order:
//!
//! 1. All five transmission headers are present and non-empty
//! 2. The certificate URL is `https` on a provider-owned domain
//! 3. The canonical message `id|time|webhook_id|sha256(body)` is built

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use url::{Host, Url};

use super::webhook_errors::WebhookError;

pub const TRANSMISSION_ID_HEADER: &str = "paypal-transmission-id";
pub const TRANSMISSION_TIME_HEADER: &str = "paypal-transmission-time";
pub const TRANSMISSION_SIG_HEADER: &str = "paypal-transmission-sig";
pub const CERT_URL_HEADER: &str = "paypal-cert-url";
pub const AUTH_ALGO_HEADER: &str = "paypal-auth-algo";

/// Headers every webhook delivery must carry.
pub const REQUIRED_HEADERS: [&str; 5] = [
    TRANSMISSION_ID_HEADER,
    TRANSMISSION_TIME_HEADER,
    TRANSMISSION_SIG_HEADER,
    CERT_URL_HEADER,
    AUTH_ALGO_HEADER,
];

/// Signature material carried by a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

impl TransmissionHeaders {
    /// Extracts the five transmission headers (names are case-insensitive).
    ///
    /// # Errors
    ///
    /// `MissingHeader` naming the first header that is absent, empty or not
    /// valid visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        Ok(Self {
            transmission_id: required(headers, TRANSMISSION_ID_HEADER)?,
            transmission_time: required(headers, TRANSMISSION_TIME_HEADER)?,
            transmission_sig: required(headers, TRANSMISSION_SIG_HEADER)?,
            cert_url: required(headers, CERT_URL_HEADER)?,
            auth_algo: required(headers, AUTH_ALGO_HEADER)?,
        })
    }
}

fn required(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(WebhookError::MissingHeader(name))
}

/// Allow-list of domains that may host signing certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertUrlPolicy {
    domains: Vec<String>,
}

impl CertUrlPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Accepts `https` URLs without credentials or a custom port whose host is
    /// an allowed domain or one of its subdomains.
    ///
    /// # Errors
    ///
    /// `UntrustedCertUrl` for anything else, including IP hosts.
    pub fn check(&self, raw: &str) -> Result<Url, WebhookError> {
        let untrusted = || WebhookError::UntrustedCertUrl(raw.to_string());

        let url = Url::parse(raw).map_err(|_| untrusted())?;
        if url.scheme() != "https" {
            return Err(untrusted());
        }
        if !url.username().is_empty() || url.password().is_some() || url.port().is_some() {
            return Err(untrusted());
        }

        let host = match url.host() {
            Some(Host::Domain(host)) => host.trim_end_matches('.').to_ascii_lowercase(),
            _ => return Err(untrusted()),
        };

        let trusted = self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        });

        if trusted {
            Ok(url)
        } else {
            Err(untrusted())
        }
    }

    #[cfg(test)]
    fn is_trusted(&self, raw: &str) -> bool {
        self.check(raw).is_ok()
    }
}

impl Default for CertUrlPolicy {
    fn default() -> Self {
        Self::new(["paypal.com"])
    }
}

/// Lowercase hex SHA-256 of the raw request body.
pub fn body_digest(raw_body: &[u8]) -> String {
    hex::encode(Sha256::digest(raw_body))
}

/// `transmission_id|transmission_time|webhook_id|sha256(body)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage(String);

impl CanonicalMessage {
    pub fn new(headers: &TransmissionHeaders, webhook_id: &str, raw_body: &[u8]) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            headers.transmission_id,
            headers.transmission_time,
            webhook_id,
            body_digest(raw_body)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
