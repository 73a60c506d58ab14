//! Webhook outcome metrics
//!
//! Counts what happened to each delivery so rejections and refused
//! transitions show up on a dashboard rather than only in logs:
//! - Atomic counters for received, authenticated, processed and rejected webhooks
//! - Breakdowns by error kind and by resource/status
//! - A bounded sample of processing durations for percentiles
//! - Prometheus-compatible text format export
//!
//! # Example
//!
//! ```rust
//! use govpay_webhooks::metrics::global_metrics;
//!
//! let output = global_metrics().to_prometheus_format();
//! assert!(output.contains("govpay_webhooks_received_total"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

use crate::error::WebhookErrorKind;
use crate::webhook::ResourceKind;

/// Maximum number of duration samples kept for percentiles
const MAX_DURATION_SAMPLES: usize = 1000;

/// Status label for statuses missing from the kind's transition table
pub const UNKNOWN_STATUS: &str = "unknown";

/// Webhook outcome counters
///
/// Thread-safe: counters are atomics, breakdowns sit behind `RwLock`s.
#[derive(Debug)]
pub struct WebhookMetrics {
    /// Deliveries handed to the processor
    pub received_total: AtomicU64,
    /// Deliveries whose signature matched a scope
    pub authenticated_total: AtomicU64,
    /// Deliveries turned into an extracted record
    pub processed_total: AtomicU64,
    /// Deliveries whose status equalled the caller's previous status
    pub redeliveries_total: AtomicU64,
    /// Deliveries that failed for any reason
    pub errors_total: AtomicU64,

    durations: RwLock<RingBuffer<Duration>>,
    errors_by_kind: RwLock<HashMap<&'static str, u64>>,
    processed_by_resource_status: RwLock<HashMap<(ResourceKind, &'static str), u64>>,
}

/// Fixed-capacity sample buffer; the oldest sample is overwritten when full
#[derive(Debug, Clone)]
struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    write_pos: usize,
}

impl<T: Clone + Ord> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.write_pos] = value;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Sample at quantile `p` (0.0 to 1.0)
    fn percentile(&self, p: f64) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort();
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted.get(idx).cloned()
    }
}

impl Default for WebhookMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookMetrics {
    /// Create an empty metrics set
    pub fn new() -> Self {
        Self {
            received_total: AtomicU64::new(0),
            authenticated_total: AtomicU64::new(0),
            processed_total: AtomicU64::new(0),
            redeliveries_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            durations: RwLock::new(RingBuffer::new(MAX_DURATION_SAMPLES)),
            errors_by_kind: RwLock::new(HashMap::new()),
            processed_by_resource_status: RwLock::new(HashMap::new()),
        }
    }

    /// Record a delivery entering the processor
    pub fn record_received(&self) {
        self.received_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery that passed signature verification
    pub fn record_authenticated(&self) {
        self.authenticated_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery turned into a record
    pub fn record_processed(&self, kind: ResourceKind, status: &str, redelivery: bool, duration: Duration) {
        self.processed_total.fetch_add(1, Ordering::Relaxed);
        if redelivery {
            self.redeliveries_total.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut durations) = self.durations.write() {
            durations.push(duration);
        }

        if let Ok(mut breakdown) = self.processed_by_resource_status.write() {
            *breakdown.entry((kind, status_label(kind, status))).or_insert(0) += 1;
        }
    }

    /// Record a failed delivery
    pub fn record_error(&self, kind: WebhookErrorKind) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut breakdown) = self.errors_by_kind.write() {
            *breakdown.entry(kind.as_str()).or_insert(0) += 1;
        }
    }

    /// Failures recorded for one error kind
    pub fn errors_of_kind(&self, kind: WebhookErrorKind) -> u64 {
        self.errors_by_kind
            .read()
            .ok()
            .and_then(|breakdown| breakdown.get(kind.as_str()).copied())
            .unwrap_or(0)
    }

    /// Records produced for one resource kind and status
    ///
    /// Statuses the kind's table does not know are counted together under
    /// [`UNKNOWN_STATUS`].
    pub fn processed_with_status(&self, kind: ResourceKind, status: &str) -> u64 {
        self.processed_by_resource_status
            .read()
            .ok()
            .and_then(|breakdown| breakdown.get(&(kind, status_label(kind, status))).copied())
            .unwrap_or(0)
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        for (name, counter) in [
            ("received_total", &self.received_total),
            ("authenticated_total", &self.authenticated_total),
            ("processed_total", &self.processed_total),
            ("redeliveries_total", &self.redeliveries_total),
            ("errors_total", &self.errors_total),
        ] {
            output.push_str(&format!(
                "govpay_webhooks_{} {}\n",
                name,
                counter.load(Ordering::Relaxed)
            ));
        }

        if let Ok(breakdown) = self.errors_by_kind.read() {
            let mut rows: Vec<_> = breakdown.iter().collect();
            rows.sort();
            for (kind, count) in rows {
                output.push_str(&format!(
                    "govpay_webhooks_errors_by_kind{{kind=\"{}\"}} {}\n",
                    kind, count
                ));
            }
        }

        if let Ok(breakdown) = self.processed_by_resource_status.read() {
            let mut rows: Vec<_> = breakdown
                .iter()
                .map(|((kind, status), count)| (kind.label(), *status, *count))
                .collect();
            rows.sort();
            for (resource, status, count) in rows {
                output.push_str(&format!(
                    "govpay_webhooks_processed{{resource=\"{}\",status=\"{}\"}} {}\n",
                    resource, status, count
                ));
            }
        }

        if let Ok(durations) = self.durations.read() {
            for (label, p) in [("p50", 0.5), ("p95", 0.95), ("p99", 0.99)] {
                if let Some(sample) = durations.percentile(p) {
                    output.push_str(&format!(
                        "govpay_webhooks_processing_duration_{}_us {}\n",
                        label,
                        sample.as_micros()
                    ));
                }
            }
        }

        output
    }
}

/// Bounded label for `status`: the table's own name, or [`UNKNOWN_STATUS`]
fn status_label(kind: ResourceKind, status: &str) -> &'static str {
    kind.transitions()
        .known_status(status)
        .unwrap_or(UNKNOWN_STATUS)
}

/// Global metrics instance
pub static METRICS: OnceLock<WebhookMetrics> = OnceLock::new();

/// Get or initialize the global metrics instance
pub fn global_metrics() -> &'static WebhookMetrics {
    METRICS.get_or_init(WebhookMetrics::new)
}
