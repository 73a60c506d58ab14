//! Webhook Processing Pipeline
//!
//! Wires authentication, parsing and transition validation together. Every
//! step is synchronous; the caller owns transport, persistence and the
//! per-resource ordering of deliveries.
//!
//! # Architecture
//!
//! ```text
//! raw body + Pay-Signature
//!       |
//!       v
//! [BodyAuthenticator] --> ValidationFailure / DigestFailure
//!       |
//!       v
//! [Parse JSON] --> Shape
//!       |
//!       v
//! [Payment|Refund validate_shape] --> Shape
//!       |
//!       v
//! [TransitionTable check] --> InvalidStatusTransition
//!       |
//!       v
//! ExtractedRecord --> optional RecordHandler
//! ```

use std::time::Instant;

use serde_json::Value;

use crate::config::{GovpayConfig, SecretScope, WebhookSecrets};
use crate::error::{WebhookError, WebhookResult};
use crate::metrics::{global_metrics, WebhookMetrics};
use crate::webhook::authenticator::BodyAuthenticator;
use crate::webhook::events::{ExtractedRecord, ResourceKind, WebhookEvent};
use crate::webhook::payment::PaymentProcessor;
use crate::webhook::refund::{RefundProcessor, RefundShapeCheck};
use crate::webhook::transition::apply;

/// Consumer of records produced by [`WebhookProcessor::process_with`]
pub trait RecordHandler: Send + Sync {
    /// Handle an accepted payment webhook
    fn on_payment(&self, record: &ExtractedRecord) -> anyhow::Result<()>;

    /// Handle an accepted refund webhook
    fn on_refund(&self, record: &ExtractedRecord) -> anyhow::Result<()>;
}

/// Authenticates and applies webhook deliveries
#[derive(Debug, Clone)]
pub struct WebhookProcessor {
    authenticator: BodyAuthenticator,
    payments: PaymentProcessor,
    refunds: RefundProcessor,
    metrics: &'static WebhookMetrics,
}

impl WebhookProcessor {
    /// Build from loaded configuration
    pub fn new(config: &GovpayConfig) -> Self {
        Self::from_parts(config.webhook_secrets.clone(), config.refund_shape)
    }

    /// Build from secrets and refund strictness
    pub fn from_parts(secrets: WebhookSecrets, refund_shape: RefundShapeCheck) -> Self {
        Self {
            authenticator: BodyAuthenticator::new(secrets),
            payments: PaymentProcessor,
            refunds: RefundProcessor::new(refund_shape),
            metrics: global_metrics(),
        }
    }

    /// Record outcomes in `metrics` instead of the global instance
    pub fn with_metrics(mut self, metrics: &'static WebhookMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// The body authenticator
    pub fn authenticator(&self) -> &BodyAuthenticator {
        &self.authenticator
    }

    /// Authenticate only; returns the matching scope
    pub fn authenticate(&self, body: &[u8], signature: Option<&str>) -> WebhookResult<SecretScope> {
        self.authenticator
            .authenticate_scope(body, signature)
            .map_err(|e| self.failed(e))
    }

    /// Validate an already authenticated event and extract its record
    pub fn apply(&self, event: &WebhookEvent, previous_status: Option<&str>) -> WebhookResult<ExtractedRecord> {
        match event.kind() {
            ResourceKind::Payment => apply(&self.payments, event, previous_status),
            ResourceKind::Refund => apply(&self.refunds, event, previous_status),
        }
    }

    /// Authenticate, parse and apply one delivery
    ///
    /// # Errors
    ///
    /// Any [`WebhookError`]; a failed signature check stops before the body
    /// is parsed.
    pub fn process(
        &self,
        kind: ResourceKind,
        body: &[u8],
        signature: Option<&str>,
        previous_status: Option<&str>,
    ) -> WebhookResult<ExtractedRecord> {
        let started = Instant::now();
        self.metrics.record_received();

        let scope = self.authenticate(body, signature)?;
        self.metrics.record_authenticated();

        let event = WebhookEvent::from_slice(kind, body).map_err(|e| self.failed(e))?;
        let record = self.apply(&event, previous_status).map_err(|e| self.failed(e))?;

        self.record_outcome(&record, previous_status, started);

        tracing::info!(
            resource = %kind,
            id = record.id.as_deref().unwrap_or("unknown"),
            status = %record.status,
            service_type = record.service_type.as_str(),
            scope = %scope,
            "Webhook processed"
        );

        Ok(record)
    }

    /// [`process`](Self::process), then hand the record to `handler`
    pub fn process_with<H>(
        &self,
        kind: ResourceKind,
        body: &[u8],
        signature: Option<&str>,
        previous_status: Option<&str>,
        handler: &H,
    ) -> WebhookResult<ExtractedRecord>
    where
        H: RecordHandler + ?Sized,
    {
        let record = self.process(kind, body, signature, previous_status)?;

        let outcome = match kind {
            ResourceKind::Payment => handler.on_payment(&record),
            ResourceKind::Refund => handler.on_refund(&record),
        };

        outcome
            .map_err(|e| self.failed(WebhookError::Handler(format!("{e:#}"))))
            .map(|()| record)
    }

    /// Apply an authenticated payment payload
    pub fn process_payment_webhook(
        &self,
        payload: Value,
        previous_status: Option<&str>,
    ) -> WebhookResult<ExtractedRecord> {
        self.apply_authenticated(WebhookEvent::new(ResourceKind::Payment, payload), previous_status)
    }

    /// Apply an authenticated refund payload
    pub fn process_refund_webhook(
        &self,
        payload: Value,
        previous_status: Option<&str>,
    ) -> WebhookResult<ExtractedRecord> {
        self.apply_authenticated(WebhookEvent::new(ResourceKind::Refund, payload), previous_status)
    }

    fn apply_authenticated(
        &self,
        event: WebhookEvent,
        previous_status: Option<&str>,
    ) -> WebhookResult<ExtractedRecord> {
        let started = Instant::now();
        self.metrics.record_received();
        self.metrics.record_authenticated();

        let record = self.apply(&event, previous_status).map_err(|e| self.failed(e))?;
        self.record_outcome(&record, previous_status, started);
        Ok(record)
    }

    fn record_outcome(&self, record: &ExtractedRecord, previous_status: Option<&str>, started: Instant) {
        let redelivery = previous_status == Some(record.status.as_str());
        self.metrics
            .record_processed(record.kind(), &record.status, redelivery, started.elapsed());
    }

    fn failed(&self, err: WebhookError) -> WebhookError {
        self.metrics.record_error(err.kind());
        err
    }
}

/// Handler that accepts every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl RecordHandler for NoOpHandler {
    fn on_payment(&self, _record: &ExtractedRecord) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_refund(&self, _record: &ExtractedRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handler that logs every record
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl RecordHandler for LoggingHandler {
    fn on_payment(&self, record: &ExtractedRecord) -> anyhow::Result<()> {
        let fields = record.payment();
        tracing::info!(
            payment_id = record.id.as_deref().unwrap_or("unknown"),
            status = %record.status,
            service_type = record.service_type.as_str(),
            amount = fields.and_then(|f| f.amount),
            reference = fields.and_then(|f| f.reference.as_deref()),
            "Payment status update"
        );
        Ok(())
    }

    fn on_refund(&self, record: &ExtractedRecord) -> anyhow::Result<()> {
        let fields = record.refund();
        tracing::info!(
            refund_id = record.id.as_deref().unwrap_or("unknown"),
            payment_id = fields.and_then(|f| f.payment_id.as_deref()),
            status = %record.status,
            amount = fields.and_then(|f| f.amount),
            "Refund status update"
        );
        Ok(())
    }
}

/// Adapts a closure into a [`RecordHandler`] called for both kinds
pub struct FnHandler<F>(F);

/// Wrap `f` as a [`RecordHandler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&ExtractedRecord) -> anyhow::Result<()> + Send + Sync,
{
    FnHandler(f)
}

impl<F> RecordHandler for FnHandler<F>
where
    F: Fn(&ExtractedRecord) -> anyhow::Result<()> + Send + Sync,
{
    fn on_payment(&self, record: &ExtractedRecord) -> anyhow::Result<()> {
        (self.0)(record)
    }

    fn on_refund(&self, record: &ExtractedRecord) -> anyhow::Result<()> {
        (self.0)(record)
    }
}
