//! GOV.UK Pay Webhooks - Signature Verification & Status Transition Engine
//!
//! This crate authenticates and validates webhook deliveries from the GOV.UK
//! Pay gateway for payments and refunds.
//!
//! # Features
//!
//! - **Authentication**: HMAC-SHA256 signatures under front- and back-office secrets
//! - **Transition Validation**: Per-resource status tables reject regressions and replays
//! - **Extraction**: Normalized, PII-free records for the caller to persist
//! - **Sanitization**: Payloads stripped of personal data before logging
//!
//! # Architecture
//!
//! ```text
//! Gateway ──▶ BodyAuthenticator ──▶ Payment/Refund Processor
//!                   │                        │
//!                   ▼                        ▼
//!            ┌──────────────┐        ┌───────────────┐
//!            │ Signature    │        │ Transition    │
//!            │ Verifier     │        │ Table         │
//!            └──────────────┘        └───────┬───────┘
//!                                            │
//!                                            ▼
//!                                     ExtractedRecord
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use govpay_webhooks::config::GovpayConfig;
//! use govpay_webhooks::webhook::{ResourceKind, WebhookProcessor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GovpayConfig::from_env()?;
//!     let processor = WebhookProcessor::new(&config);
//!
//!     let body = std::fs::read("webhook.json")?;
//!     let record = processor.process(
//!         ResourceKind::Payment,
//!         &body,
//!         Some("c4a6b5..."),
//!         Some("submitted"),
//!     )?;
//!
//!     println!("{} is now {}", record.id.unwrap_or_default(), record.status);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod resources;
pub mod webhook;

// Re-exports for convenience
pub use api::{ApiCredentials, GovpayApi, HttpMethod};
pub use config::{GovpayConfig, SecretScope, SecretString, WebhookSecrets};
pub use error::{ConfigError, GovpayApiError, ValidationFailure, WebhookError, WebhookErrorKind, WebhookResult};
pub use resources::{Payment, Refund};
pub use webhook::{
    BodyAuthenticator, ExtractedRecord, RecordHandler, ResourceKind, SignatureVerifier,
    WebhookEvent, WebhookProcessor,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
