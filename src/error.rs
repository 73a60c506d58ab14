//! Error types for GOV.UK Pay webhook handling
//!
//! This module provides the error type hierarchy using `thiserror`.
//! [`WebhookError`] is what the webhook engine returns; callers branch on
//! [`WebhookError::kind`] to decide how to answer the gateway.

use thiserror::Error;

/// Why a webhook body failed authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    /// No signature header was supplied, or it was blank
    MissingSignature,
    /// The signature matched none of the configured scopes
    Mismatch,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSignature => f.write_str("Missing expected signature"),
            Self::Mismatch => f.write_str("digest/signature header mismatch"),
        }
    }
}

/// Errors raised while authenticating or applying a webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// A signing secret is missing or the digest could not be computed
    #[error("Payment webhook signature generation failed: {0}")]
    DigestFailure(String),

    /// The signature header was absent or did not match
    #[error("Webhook validation failed: {0}")]
    ValidationFailure(ValidationFailure),

    /// The payload is malformed for its resource kind
    #[error("{0}")]
    Shape(String),

    /// The payload is well formed but the status change is not permitted
    #[error(
        "Invalid {resource} status transition from {from} to {to}{}",
        transition_context(.resource, .id)
    )]
    InvalidStatusTransition {
        /// Resource label ("payment" or "refund")
        resource: &'static str,
        /// Status the caller last recorded
        from: String,
        /// Status carried by the webhook
        to: String,
        /// Resource identifier, when the payload carries one
        id: Option<String>,
    },

    /// An injected record handler rejected the extracted record
    #[error("Record handler failed: {0}")]
    Handler(String),
}

fn transition_context(resource: &str, id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" for {resource} {id}"),
        None => String::new(),
    }
}

/// Discriminant of [`WebhookError`] for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookErrorKind {
    /// See [`WebhookError::DigestFailure`]
    DigestFailure,
    /// See [`WebhookError::ValidationFailure`]
    ValidationFailure,
    /// See [`WebhookError::Shape`]
    Shape,
    /// See [`WebhookError::InvalidStatusTransition`]
    InvalidStatusTransition,
    /// See [`WebhookError::Handler`]
    Handler,
}

impl WebhookErrorKind {
    /// Stable snake_case name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigestFailure => "digest_failure",
            Self::ValidationFailure => "validation_failure",
            Self::Shape => "shape_error",
            Self::InvalidStatusTransition => "invalid_status_transition",
            Self::Handler => "handler",
        }
    }
}

impl WebhookError {
    /// Create a shape error from a message
    pub fn shape<S: Into<String>>(msg: S) -> Self {
        WebhookError::Shape(msg.into())
    }

    /// Create a digest failure from anything displayable
    pub fn digest<E: std::fmt::Display>(err: E) -> Self {
        WebhookError::DigestFailure(err.to_string())
    }

    /// The kind of this error
    pub fn kind(&self) -> WebhookErrorKind {
        match self {
            Self::DigestFailure(_) => WebhookErrorKind::DigestFailure,
            Self::ValidationFailure(_) => WebhookErrorKind::ValidationFailure,
            Self::Shape(_) => WebhookErrorKind::Shape,
            Self::InvalidStatusTransition { .. } => WebhookErrorKind::InvalidStatusTransition,
            Self::Handler(_) => WebhookErrorKind::Handler,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    /// An environment variable holds an unusable value
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Errors reported by a gateway API client
#[derive(Error, Debug)]
pub enum GovpayApiError {
    /// The request could not be sent or the gateway answered with an error
    #[error("Error sending request to govpay ({method} {path}): {message}")]
    RequestFailed {
        /// HTTP method
        method: String,
        /// Request path
        path: String,
        /// Transport or response details
        message: String,
    },

    /// Request parameters could not be encoded
    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),
}

/// Result type alias for webhook operations
pub type WebhookResult<T> = std::result::Result<T, WebhookError>;
