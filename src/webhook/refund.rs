//! Refund webhooks
//!
//! Refund deliveries have been seen in two layouts. The flat one carries
//! `refund_id`, `payment_id` and `status` at the top level; the envelope one
//! carries `resource_id`, `event_type` and `resource.state.status`. Both are
//! read, flat members first.
//!
//! Deployments disagree on whether `event_type` must be
//! `card_payment_refunded`; [`RefundShapeCheck`] makes that a configuration
//! choice.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WebhookError, WebhookResult};
use crate::webhook::events::{RefundFields, ResourceFields, WebhookEvent};
use crate::webhook::sanitizer::sanitized_string;
use crate::webhook::transition::{TransitionTable, WebhookResource};

/// Legal refund status transitions
pub static REFUND_TRANSITIONS: TransitionTable = TransitionTable::new(
    "refund",
    &[
        ("submitted", &["success", "error"]),
        ("success", &[]),
        ("error", &[]),
    ],
);

/// `event_type` of a refund notification
pub const REFUND_EVENT_TYPE: &str = "card_payment_refunded";

/// How strictly refund payloads are checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundShapeCheck {
    /// Also require `event_type == "card_payment_refunded"`
    #[default]
    Strict,
    /// Only require an identifier and a status
    Permissive,
}

impl FromStr for RefundShapeCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!("expected 'strict' or 'permissive', got {other:?}")),
        }
    }
}

/// Shape validation and field extraction for refund webhooks
#[derive(Debug, Clone, Copy, Default)]
pub struct RefundProcessor {
    shape: RefundShapeCheck,
}

impl RefundProcessor {
    /// Processor with the given strictness
    pub fn new(shape: RefundShapeCheck) -> Self {
        Self { shape }
    }

    /// The configured strictness
    pub fn shape_check(&self) -> RefundShapeCheck {
        self.shape
    }

    fn invalid(event: &WebhookEvent) -> WebhookError {
        WebhookError::shape(format!(
            "Invalid refund webhook: {}",
            sanitized_string(event.payload())
        ))
    }
}

impl WebhookResource for RefundProcessor {
    fn resource_label(&self) -> &'static str {
        "refund"
    }

    fn transitions(&self) -> &'static TransitionTable {
        &REFUND_TRANSITIONS
    }

    fn validate_shape(&self, event: &WebhookEvent) -> WebhookResult<()> {
        if self.shape == RefundShapeCheck::Strict
            && event.text_at("/event_type").as_deref() != Some(REFUND_EVENT_TYPE)
        {
            return Err(Self::invalid(event));
        }

        if self.extract_id(event).is_none() || self.extract_status(event).is_none() {
            return Err(Self::invalid(event));
        }

        Ok(())
    }

    fn extract_id(&self, event: &WebhookEvent) -> Option<String> {
        event.first_non_blank(&["/refund_id", "/resource_id"])
    }

    fn extract_status(&self, event: &WebhookEvent) -> Option<String> {
        event.first_non_blank(&["/status", "/resource/state/status"])
    }

    fn extract_fields(&self, event: &WebhookEvent) -> ResourceFields {
        ResourceFields::Refund(RefundFields {
            payment_id: event.first_non_blank(&["/payment_id", "/resource/payment_id"]),
            amount: event
                .integer_at("/amount")
                .or_else(|| event.integer_at("/resource/amount")),
            created_date: event.first_non_blank(&["/created_date", "/resource/created_date"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::events::{ExtractedRecord, ResourceKind};
    use crate::webhook::transition::apply;
    use serde_json::{json, Value};

    fn envelope_body() -> Value {
        json!({
            "webhook_message_id": "fe5d6e4d-4a4b-4c33-9b6b-1d9f0c6f4b57",
            "created_date": "2019-09-19T16:53:03.213Z",
            "resource_id": "j6se0f2o427g28g8yg3u3i",
            "api_version": 1,
            "resource_type": "refund",
            "event_type": "card_payment_refunded",
            "resource": {
                "amount": 2000,
                "created_date": "2019-09-19T16:53:03.213Z",
                "payment_id": "hu20sqlact5260q2nanm0q8u93",
                "email": "sherlock.holmes@example.com",
                "state": { "status": "success" }
            }
        })
    }

    fn flat_body() -> Value {
        json!({
            "refund_id": "j6se0f2o427g28g8yg3u3i",
            "payment_id": "hu20sqlact5260q2nanm0q8u93",
            "amount": 2000,
            "status": "success",
            "created_date": "2019-09-19T16:53:03.213Z"
        })
    }

    fn run(shape: RefundShapeCheck, payload: Value, previous: Option<&str>) -> WebhookResult<ExtractedRecord> {
        apply(
            &RefundProcessor::new(shape),
            &WebhookEvent::new(ResourceKind::Refund, payload),
            previous,
        )
    }

    #[test]
    fn test_envelope_layout() {
        let record = run(RefundShapeCheck::Strict, envelope_body(), None).unwrap();
        assert_eq!(record.id.as_deref(), Some("j6se0f2o427g28g8yg3u3i"));
        assert_eq!(record.status, "success");
        let fields = record.refund().unwrap();
        assert_eq!(fields.payment_id.as_deref(), Some("hu20sqlact5260q2nanm0q8u93"));
        assert_eq!(fields.amount, Some(2000));
    }

    #[test]
    fn test_flat_layout_permissive() {
        let record = run(RefundShapeCheck::Permissive, flat_body(), Some("submitted")).unwrap();
        assert_eq!(record.id.as_deref(), Some("j6se0f2o427g28g8yg3u3i"));
        assert_eq!(
            record.refund().unwrap().created_date.as_deref(),
            Some("2019-09-19T16:53:03.213Z")
        );
    }

    #[test]
    fn test_strict_requires_event_type() {
        let err = run(RefundShapeCheck::Strict, flat_body(), None).unwrap_err();
        assert!(err.to_string().contains("Invalid refund webhook"));

        let mut payload = envelope_body();
        payload["event_type"] = json!("card_payment_succeeded");
        assert!(run(RefundShapeCheck::Strict, payload.clone(), None).is_err());
        assert!(run(RefundShapeCheck::Permissive, payload, None).is_ok());
    }

    #[test]
    fn test_missing_identifier() {
        for shape in [RefundShapeCheck::Strict, RefundShapeCheck::Permissive] {
            let mut payload = envelope_body();
            payload.as_object_mut().unwrap().remove("resource_id");
            let err = run(shape, payload, None).unwrap_err();
            let message = err.to_string();
            assert!(message.contains("Invalid refund webhook"));
            assert!(!message.contains("sherlock.holmes@example.com"));
        }
    }

    #[test]
    fn test_blank_status() {
        let mut payload = flat_body();
        payload["status"] = json!("  ");
        assert!(matches!(
            run(RefundShapeCheck::Permissive, payload, None),
            Err(WebhookError::Shape(_))
        ));
    }

    #[test]
    fn test_refund_transitions() {
        let mut payload = flat_body();
        payload["status"] = json!("error");
        assert!(run(RefundShapeCheck::Permissive, payload.clone(), Some("submitted")).is_ok());

        let err = run(RefundShapeCheck::Permissive, payload, Some("success")).unwrap_err();
        assert!(err.to_string().contains("from success to error"));
    }

    #[test]
    fn test_shape_check_parsing() {
        assert_eq!("Strict".parse::<RefundShapeCheck>().unwrap(), RefundShapeCheck::Strict);
        assert_eq!(
            "permissive".parse::<RefundShapeCheck>().unwrap(),
            RefundShapeCheck::Permissive
        );
        assert!("lenient".parse::<RefundShapeCheck>().is_err());
    }
}
