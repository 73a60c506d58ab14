//! Payment webhooks
//!
//! Payload shape (only the members this crate reads):
//!
//! ```json
//! {
//!   "resource_type": "payment",
//!   "resource_id": "hu20sqlact5260q2nanm0q8u93",
//!   "resource": {
//!     "payment_id": "hu20sqlact5260q2nanm0q8u93",
//!     "amount": 5000,
//!     "description": "Pay your council tax",
//!     "reference": "12345",
//!     "created_date": "2019-07-11T10:36:26.988Z",
//!     "moto": false,
//!     "state": { "status": "submitted", "finished": false },
//!     "refund_summary": { "status": "available", "amount_available": 5000, "amount_submitted": 0 }
//!   }
//! }
//! ```

use crate::error::{WebhookError, WebhookResult};
use crate::webhook::events::{PaymentFields, RefundSummary, ResourceFields, WebhookEvent};
use crate::webhook::sanitizer::sanitized_string;
use crate::webhook::transition::{TransitionTable, WebhookResource};

/// Legal payment status transitions
pub static PAYMENT_TRANSITIONS: TransitionTable = TransitionTable::new(
    "payment",
    &[
        (
            "created",
            &["started", "submitted", "success", "failed", "cancelled", "expired", "error"],
        ),
        (
            "started",
            &["submitted", "success", "failed", "cancelled", "expired", "error"],
        ),
        ("submitted", &["success", "failed", "cancelled", "expired", "error"]),
        ("success", &[]),
        ("failed", &[]),
        ("cancelled", &[]),
        ("expired", &[]),
        ("error", &[]),
    ],
);

const RESOURCE_TYPE: &str = "/resource_type";
const STATUS: &str = "/resource/state/status";

/// Shape validation and field extraction for payment webhooks
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentProcessor;

impl PaymentProcessor {
    fn refund_summary(event: &WebhookEvent) -> Option<RefundSummary> {
        event.payload().pointer("/resource/refund_summary")?.as_object()?;
        Some(RefundSummary {
            status: event.text_at("/resource/refund_summary/status"),
            amount_available: event.integer_at("/resource/refund_summary/amount_available"),
            amount_submitted: event.integer_at("/resource/refund_summary/amount_submitted"),
        })
    }
}

impl WebhookResource for PaymentProcessor {
    fn resource_label(&self) -> &'static str {
        "payment"
    }

    fn transitions(&self) -> &'static TransitionTable {
        &PAYMENT_TRANSITIONS
    }

    fn validate_shape(&self, event: &WebhookEvent) -> WebhookResult<()> {
        let resource_type = event.text_at(RESOURCE_TYPE).map(|t| t.to_lowercase());
        if resource_type.as_deref() != Some("payment") {
            return Err(WebhookError::shape(format!(
                "Invalid webhook type {}",
                resource_type.as_deref().unwrap_or("<missing>")
            )));
        }

        if event.non_blank_at(STATUS).is_none() {
            return Err(WebhookError::shape(format!(
                "Webhook body missing payment status: {}",
                sanitized_string(event.payload())
            )));
        }

        Ok(())
    }

    fn extract_id(&self, event: &WebhookEvent) -> Option<String> {
        event.first_non_blank(&["/resource/payment_id", "/resource_id"])
    }

    fn extract_status(&self, event: &WebhookEvent) -> Option<String> {
        event.non_blank_at(STATUS)
    }

    fn extract_fields(&self, event: &WebhookEvent) -> ResourceFields {
        ResourceFields::Payment(PaymentFields {
            amount: event.integer_at("/resource/amount"),
            description: event.text_at("/resource/description"),
            reference: event.text_at("/resource/reference"),
            created_date: event.text_at("/resource/created_date"),
            moto: event.is_truthy_at("/resource/moto"),
            refund_summary: Self::refund_summary(event),
        })
    }
}
