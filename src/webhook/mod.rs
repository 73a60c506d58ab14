//! GOV.UK Pay Webhook Module
//!
//! Authenticates and validates webhook deliveries for payments and refunds:
//!
//! - **Signature Verification**: HMAC-SHA256 of the raw body under each secret scope
//! - **Authentication**: Constant-time comparison against the `Pay-Signature` header
//! - **Sanitization**: PII is stripped before any payload reaches a log or error
//! - **Transition Validation**: Status changes are checked against a per-kind table
//! - **Extraction**: A normalized, PII-free [`ExtractedRecord`] per delivery
//!
//! # Architecture
//!
//! ```text
//! Request -> BodyAuthenticator -> Parse -> Shape Check -> Transition Check -> ExtractedRecord
//!                  |                 |           |                |
//!                  v                 v           v                v
//!          ValidationFailure       Shape       Shape    InvalidStatusTransition
//! ```
//!
//! # Security
//!
//! - Signing secrets are supplied explicitly and never logged
//! - Constant-time signature comparison across every scope
//! - The raw body is authenticated before it is parsed
//!
//! # Example
//!
//! ```rust
//! use govpay_webhooks::config::WebhookSecrets;
//! use govpay_webhooks::webhook::{
//!     hmac_sha256_hex, RefundShapeCheck, ResourceKind, WebhookProcessor,
//! };
//!
//! let processor = WebhookProcessor::from_parts(
//!     WebhookSecrets::new("front-office-secret", "back-office-secret"),
//!     RefundShapeCheck::Strict,
//! );
//!
//! let body = br#"{"resource_type":"payment","resource":{"payment_id":"abc","state":{"status":"success"}}}"#;
//! let signature = hmac_sha256_hex(b"front-office-secret", body).unwrap();
//!
//! let record = processor
//!     .process(ResourceKind::Payment, body, Some(signature.as_str()), Some("submitted"))
//!     .unwrap();
//! assert_eq!(record.status, "success");
//! ```

pub mod authenticator;
pub mod events;
pub mod payment;
pub mod processor;
pub mod refund;
pub mod sanitizer;
pub mod signature;
pub mod transition;

// Re-export commonly used items
pub use authenticator::BodyAuthenticator;
pub use events::{
    ExtractedRecord, PaymentFields, RefundFields, RefundSummary, ResourceFields, ResourceKind,
    ServiceType, WebhookEvent,
};
pub use payment::{PaymentProcessor, PAYMENT_TRANSITIONS};
pub use processor::{handler_fn, FnHandler, LoggingHandler, NoOpHandler, RecordHandler, WebhookProcessor};
pub use refund::{RefundProcessor, RefundShapeCheck, REFUND_EVENT_TYPE, REFUND_TRANSITIONS};
pub use sanitizer::{sanitize, sanitized_string};
pub use signature::{hmac_sha256_hex, verify_callback, ScopedDigests, SignatureVerifier, SIGNATURE_HEADER};
pub use transition::{apply, TransitionTable, WebhookResource};
