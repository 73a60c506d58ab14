//! Gateway and webhook configuration
//!
//! All settings are read once at process start and handed to the webhook
//! engine as an immutable value. Nothing in the engine looks configuration
//! up on its own.
//!
//! # Environment Variables
//!
//! - `GOVPAY_URL`: Base URL of the gateway API (required)
//! - `GOVPAY_FRONT_OFFICE_API_TOKEN`: Front-office API token (required)
//! - `GOVPAY_BACK_OFFICE_API_TOKEN`: Back-office API token (required)
//! - `GOVPAY_HOST_IS_BACK_OFFICE`: `true` when this host serves back-office users
//! - `GOVPAY_FRONT_OFFICE_WEBHOOK_SIGNING_SECRET`: Front-office webhook secret (required)
//! - `GOVPAY_BACK_OFFICE_WEBHOOK_SIGNING_SECRET`: Back-office webhook secret (required)
//! - `GOVPAY_REFUND_WEBHOOK_SHAPE`: `strict` (default) or `permissive`

use std::env;
use std::fmt;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::webhook::refund::RefundShapeCheck;

/// Secrets shorter than this are accepted but logged as a warning
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Which operational context a signing secret belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretScope {
    /// Citizen-facing payments
    FrontOffice,
    /// Staff-initiated (MOTO) payments
    BackOffice,
}

impl SecretScope {
    /// Both scopes, in the order digests are computed
    pub const ALL: [SecretScope; 2] = [SecretScope::FrontOffice, SecretScope::BackOffice];

    /// snake_case name of the scope
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontOffice => "front_office",
            Self::BackOffice => "back_office",
        }
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secret value (signing secret or API token). Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw bytes of the secret
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The secret as text
    pub fn expose_str(&self) -> &str {
        &self.0
    }

    /// True when the secret holds no characters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// The per-scope webhook signing secrets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookSecrets {
    front_office: Option<SecretString>,
    back_office: Option<SecretString>,
}

impl WebhookSecrets {
    /// Secrets for both scopes
    pub fn new(front_office: impl Into<String>, back_office: impl Into<String>) -> Self {
        Self {
            front_office: Some(SecretString::new(front_office)),
            back_office: Some(SecretString::new(back_office)),
        }
    }

    /// Set (or replace) the secret for one scope
    pub fn with_secret(mut self, scope: SecretScope, secret: impl Into<String>) -> Self {
        let secret = Some(SecretString::new(secret));
        match scope {
            SecretScope::FrontOffice => self.front_office = secret,
            SecretScope::BackOffice => self.back_office = secret,
        }
        self
    }

    /// The secret configured for `scope`, if any
    pub fn get(&self, scope: SecretScope) -> Option<&SecretString> {
        match scope {
            SecretScope::FrontOffice => self.front_office.as_ref(),
            SecretScope::BackOffice => self.back_office.as_ref(),
        }
    }
}

/// Full gateway configuration
#[derive(Debug, Clone)]
pub struct GovpayConfig {
    /// Base URL of the gateway API
    pub govpay_url: String,
    /// Bearer token for front-office API calls
    pub front_office_api_token: SecretString,
    /// Bearer token for back-office (MOTO) API calls
    pub back_office_api_token: SecretString,
    /// Whether this host serves back-office users
    pub host_is_back_office: bool,
    /// Webhook signing secrets
    pub webhook_secrets: WebhookSecrets,
    /// How strictly refund webhook payloads are checked
    pub refund_shape: RefundShapeCheck,
}

impl GovpayConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when a required variable is unset
    /// and [`ConfigError::InvalidValue`] when a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                Some(_) => Err(ConfigError::InvalidValue {
                    name,
                    reason: "value cannot be empty".to_string(),
                }),
                None => Err(ConfigError::MissingVar(name)),
            }
        };

        let govpay_url = required("GOVPAY_URL")?;
        let front_office_api_token = SecretString::new(required("GOVPAY_FRONT_OFFICE_API_TOKEN")?);
        let back_office_api_token = SecretString::new(required("GOVPAY_BACK_OFFICE_API_TOKEN")?);

        let host_is_back_office = match lookup("GOVPAY_HOST_IS_BACK_OFFICE") {
            Some(value) => parse_bool("GOVPAY_HOST_IS_BACK_OFFICE", &value)?,
            None => false,
        };

        let webhook_secrets = WebhookSecrets::new(
            required("GOVPAY_FRONT_OFFICE_WEBHOOK_SIGNING_SECRET")?,
            required("GOVPAY_BACK_OFFICE_WEBHOOK_SIGNING_SECRET")?,
        );
        for scope in SecretScope::ALL {
            if let Some(secret) = webhook_secrets.get(scope) {
                if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
                    warn!(
                        scope = %scope,
                        "Webhook signing secret is shorter than {} characters",
                        MIN_RECOMMENDED_SECRET_LEN
                    );
                }
            }
        }

        let refund_shape = match lookup("GOVPAY_REFUND_WEBHOOK_SHAPE") {
            Some(value) => value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "GOVPAY_REFUND_WEBHOOK_SHAPE",
                reason,
            })?,
            None => RefundShapeCheck::default(),
        };

        info!(
            govpay_url = %govpay_url,
            host_is_back_office,
            refund_shape = ?refund_shape,
            "Govpay configuration loaded"
        );

        Ok(Self {
            govpay_url,
            front_office_api_token,
            back_office_api_token,
            host_is_back_office,
            webhook_secrets,
            refund_shape,
        })
    }

    /// Create a test configuration (for testing only)
    pub fn test_config() -> Self {
        Self {
            govpay_url: "https://publicapi.payments.service.gov.uk/v1".to_string(),
            front_office_api_token: SecretString::new("front-office-api-token-12345"),
            back_office_api_token: SecretString::new("back-office-api-token-67890"),
            host_is_back_office: false,
            webhook_secrets: WebhookSecrets::new(
                "front-office-webhook-secret-for-tests",
                "back-office-webhook-secret-for-tests",
            ),
            refund_shape: RefundShapeCheck::Strict,
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
