//! Webhook engine tests
//!
//! End-to-end checks over realistic gateway bodies: authentication under both
//! secret scopes, full transition tables, and the processing pipeline.

use std::sync::atomic::Ordering;
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use govpay_webhooks::config::{GovpayConfig, SecretScope, WebhookSecrets};
use govpay_webhooks::error::{ValidationFailure, WebhookError, WebhookErrorKind};
use govpay_webhooks::metrics::WebhookMetrics;
use govpay_webhooks::webhook::{
    apply, handler_fn, hmac_sha256_hex, sanitized_string, BodyAuthenticator, ExtractedRecord,
    PaymentProcessor, RefundProcessor, RefundShapeCheck, ResourceKind, ServiceType,
    SignatureVerifier, WebhookEvent, WebhookProcessor, PAYMENT_TRANSITIONS, REFUND_TRANSITIONS,
};

const PAYMENT_BODY: &str = include_str!("fixtures/webhook_payment_update_body.json");
const REFUND_BODY: &str = include_str!("fixtures/webhook_refund_update_body.json");

const FRONT_SECRET: &str = "front-office-webhook-secret-for-tests";
const BACK_SECRET: &str = "back-office-webhook-secret-for-tests";

fn payment_payload(status: &str) -> Value {
    let mut payload: Value = serde_json::from_str(PAYMENT_BODY).unwrap();
    payload["resource"]["state"]["status"] = json!(status);
    payload
}

fn refund_payload(status: &str) -> Value {
    let mut payload: Value = serde_json::from_str(REFUND_BODY).unwrap();
    payload["resource"]["state"]["status"] = json!(status);
    payload
}

fn apply_payment(payload: Value, previous: Option<&str>) -> Result<ExtractedRecord, WebhookError> {
    apply(
        &PaymentProcessor,
        &WebhookEvent::new(ResourceKind::Payment, payload),
        previous,
    )
}

fn apply_refund(payload: Value, previous: Option<&str>) -> Result<ExtractedRecord, WebhookError> {
    apply(
        &RefundProcessor::new(RefundShapeCheck::Strict),
        &WebhookEvent::new(ResourceKind::Refund, payload),
        previous,
    )
}

fn processor() -> (WebhookProcessor, &'static WebhookMetrics) {
    let metrics: &'static WebhookMetrics = Box::leak(Box::new(WebhookMetrics::new()));
    let processor = WebhookProcessor::new(&GovpayConfig::test_config()).with_metrics(metrics);
    (processor, metrics)
}

fn sign(secret: &str, body: &[u8]) -> String {
    hmac_sha256_hex(secret.as_bytes(), body).unwrap()
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[test]
fn test_body_signed_with_either_secret_is_accepted() {
    let authenticator = BodyAuthenticator::new(WebhookSecrets::new(FRONT_SECRET, BACK_SECRET));
    let body = PAYMENT_BODY.as_bytes();

    let front = sign(FRONT_SECRET, body);
    let back = sign(BACK_SECRET, body);

    assert_eq!(
        authenticator.authenticate_scope(body, Some(front.as_str())).unwrap(),
        SecretScope::FrontOffice
    );
    assert_eq!(
        authenticator.authenticate_scope(body, Some(back.as_str())).unwrap(),
        SecretScope::BackOffice
    );
}

#[test]
fn test_other_signatures_are_rejected() {
    let authenticator = BodyAuthenticator::new(WebhookSecrets::new(FRONT_SECRET, BACK_SECRET));
    let body = PAYMENT_BODY.as_bytes();
    let tampered = format!("{} ", PAYMENT_BODY);

    let claims = [
        "foo".to_string(),
        sign("some-other-secret", body),
        sign(FRONT_SECRET, tampered.as_bytes()),
        sign(FRONT_SECRET, body).to_uppercase(),
    ];

    for claim in &claims {
        let err = authenticator.authenticate(body, Some(claim.as_str())).unwrap_err();
        assert!(
            matches!(err, WebhookError::ValidationFailure(ValidationFailure::Mismatch)),
            "{claim} should be rejected"
        );
    }
}

#[test]
fn test_missing_signature_is_rejected() {
    let authenticator = BodyAuthenticator::new(WebhookSecrets::new(FRONT_SECRET, BACK_SECRET));
    for claim in [None, Some(""), Some("   ")] {
        let err = authenticator.authenticate(PAYMENT_BODY, claim).unwrap_err();
        assert!(matches!(
            err,
            WebhookError::ValidationFailure(ValidationFailure::MissingSignature)
        ));
    }
}

#[test]
fn test_digests_cover_both_scopes() {
    let verifier = SignatureVerifier::new(WebhookSecrets::new(FRONT_SECRET, BACK_SECRET));
    let digests = verifier.digests(PAYMENT_BODY).unwrap();

    assert_eq!(digests.len(), 2);
    assert_eq!(
        digests.get(SecretScope::FrontOffice),
        Some(sign(FRONT_SECRET, PAYMENT_BODY.as_bytes()).as_str())
    );
    assert_eq!(
        digests.get(SecretScope::BackOffice),
        Some(sign(BACK_SECRET, PAYMENT_BODY.as_bytes()).as_str())
    );
}

#[test]
fn test_missing_secret_is_digest_failure() {
    let verifier = SignatureVerifier::new(
        WebhookSecrets::default().with_secret(SecretScope::FrontOffice, FRONT_SECRET),
    );
    let err = verifier.digests(PAYMENT_BODY).unwrap_err();
    assert_eq!(err.kind(), WebhookErrorKind::DigestFailure);
}

// ============================================================================
// TRANSITION TABLES
// ============================================================================

#[test]
fn test_payment_transition_table() {
    for previous in PAYMENT_TRANSITIONS.statuses() {
        for next in PAYMENT_TRANSITIONS.statuses() {
            let result = apply_payment(payment_payload(next), Some(previous));

            if previous == next || PAYMENT_TRANSITIONS.permits(previous, next) {
                assert!(result.is_ok(), "{previous} -> {next} should be accepted");
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), WebhookErrorKind::InvalidStatusTransition);
                let message = err.to_string();
                assert!(message.contains(previous), "{message}");
                assert!(message.contains(next), "{message}");
            }
        }
    }
}

#[test]
fn test_refund_transition_table() {
    for previous in REFUND_TRANSITIONS.statuses() {
        for next in REFUND_TRANSITIONS.statuses() {
            let result = apply_refund(refund_payload(next), Some(previous));

            if previous == next || REFUND_TRANSITIONS.permits(previous, next) {
                assert!(result.is_ok(), "{previous} -> {next} should be accepted");
            } else {
                let err = result.unwrap_err();
                assert!(matches!(err, WebhookError::InvalidStatusTransition { .. }));
                let message = err.to_string();
                assert!(message.contains(previous), "{message}");
                assert!(message.contains(next), "{message}");
            }
        }
    }
}

#[test]
fn test_terminal_statuses() {
    let payment: Vec<_> = PAYMENT_TRANSITIONS.terminal_statuses().collect();
    assert_eq!(payment, vec!["success", "failed", "cancelled", "expired", "error"]);

    let refund: Vec<_> = REFUND_TRANSITIONS.terminal_statuses().collect();
    assert_eq!(refund, vec!["success", "error"]);

    for status in payment {
        assert_eq!(PAYMENT_TRANSITIONS.allowed_from(status), Some(&[][..]));
    }
    for status in refund {
        assert_eq!(REFUND_TRANSITIONS.allowed_from(status), Some(&[][..]));
    }
}

#[test]
fn test_redelivery_of_terminal_status() {
    let record = apply_payment(payment_payload("success"), Some("success")).unwrap();
    assert_eq!(record.status, "success");
    assert!(record.is_terminal());
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_mixed_case_payment_advances() {
    let record = apply_payment(payment_payload("submitted"), Some("created")).unwrap();

    assert_eq!(record.status, "submitted");
    assert_eq!(record.id.as_deref(), Some("hu20sqlact5260q2nanm0q8u93"));
    assert_eq!(record.service_type, ServiceType::FrontOffice);
    assert!(!record.is_terminal());
}

#[test]
fn test_payment_regression_refused() {
    let err = apply_payment(payment_payload("submitted"), Some("success")).unwrap_err();

    assert!(matches!(err, WebhookError::InvalidStatusTransition { .. }));
    let message = err.to_string();
    assert!(message.contains("success"));
    assert!(message.contains("submitted"));
}

#[test]
fn test_refund_without_identifier_is_shape_error() {
    let mut payload = refund_payload("success");
    payload.as_object_mut().unwrap().remove("resource_id");

    let err = apply_refund(payload, None).unwrap_err();
    assert!(matches!(err, WebhookError::Shape(_)));
    assert!(err.to_string().contains("Invalid refund webhook"));
}

#[test]
fn test_refund_record() {
    let record = apply_refund(refund_payload("success"), Some("submitted")).unwrap();
    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(
        value,
        json!({
            "id": "j6se0f2o427g28g8yg3u3i",
            "status": "success",
            "service_type": "front_office",
            "payment_id": "hu20sqlact5260q2nanm0q8u93",
            "amount": 2000,
            "created_date": "2019-07-11T10:36:26.988Z"
        })
    );
}

#[test]
fn test_sanitized_fixture_has_no_pii() {
    let payload: Value = serde_json::from_str(PAYMENT_BODY).unwrap();
    let rendered = sanitized_string(&payload);

    assert!(!rendered.contains("sherlock.holmes@example.com"));
    assert!(!rendered.contains("Baker Street"));
    assert!(rendered.contains("hu20sqlact5260q2nanm0q8u93"));
}

// ============================================================================
// PROCESSING PIPELINE
// ============================================================================

#[test]
fn test_process_signed_payment() {
    let (processor, metrics) = processor();
    let body = PAYMENT_BODY.as_bytes();
    let signature = sign(FRONT_SECRET, body);

    let record = processor
        .process(ResourceKind::Payment, body, Some(signature.as_str()), Some("created"))
        .unwrap();

    assert_eq!(record.status, "submitted");
    assert_eq!(metrics.received_total.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.authenticated_total.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.processed_with_status(ResourceKind::Payment, "submitted"), 1);
    assert_eq!(metrics.errors_total.load(Ordering::Relaxed), 0);
}

#[test]
fn test_process_counts_every_failure_kind() {
    let (processor, metrics) = processor();
    let body = PAYMENT_BODY.as_bytes();
    let signature = sign(BACK_SECRET, body);

    let _ = processor.process(ResourceKind::Payment, body, Some("bad"), None);
    let _ = processor.process(ResourceKind::Payment, body, Some(signature.as_str()), Some("success"));

    let garbage = b"{\"resource_type\": \"payment\"}";
    let garbage_signature = sign(FRONT_SECRET, garbage);
    let _ = processor.process(ResourceKind::Payment, garbage, Some(garbage_signature.as_str()), None);

    assert_eq!(metrics.errors_total.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.errors_of_kind(WebhookErrorKind::ValidationFailure), 1);
    assert_eq!(metrics.errors_of_kind(WebhookErrorKind::InvalidStatusTransition), 1);
    assert_eq!(metrics.errors_of_kind(WebhookErrorKind::Shape), 1);
    assert_eq!(metrics.processed_total.load(Ordering::Relaxed), 0);
}

#[test]
fn test_unrecognized_statuses_do_not_grow_metric_labels() {
    let (processor, metrics) = processor();

    for i in 0..500 {
        let body = serde_json::to_vec(&payment_payload(&format!("bogus{i}"))).unwrap();
        let signature = sign(FRONT_SECRET, &body);
        processor
            .process(ResourceKind::Payment, &body, Some(signature.as_str()), None)
            .unwrap();
    }

    let output = metrics.to_prometheus_format();
    let label_lines = output
        .lines()
        .filter(|line| line.starts_with("govpay_webhooks_processed{"))
        .count();

    assert_eq!(metrics.processed_total.load(Ordering::Relaxed), 500);
    assert_eq!(label_lines, 1);
    assert!(output.contains("govpay_webhooks_processed{resource=\"payment\",status=\"unknown\"} 500"));
}

#[test]
fn test_permissive_processor_accepts_flat_refund() {
    let mut config = GovpayConfig::test_config();
    config.refund_shape = RefundShapeCheck::Permissive;
    let processor = WebhookProcessor::new(&config);

    let body = serde_json::to_vec(&json!({
        "refund_id": "j6se0f2o427g28g8yg3u3i",
        "payment_id": "hu20sqlact5260q2nanm0q8u93",
        "amount": 2000,
        "status": "error"
    }))
    .unwrap();
    let signature = sign(BACK_SECRET, &body);

    let record = processor
        .process(ResourceKind::Refund, &body, Some(signature.as_str()), Some("submitted"))
        .unwrap();
    assert_eq!(record.status, "error");
}

#[test]
fn test_handler_sees_refund_records() {
    let (processor, _) = processor();
    let seen = Mutex::new(Vec::new());
    let handler = handler_fn(|record: &ExtractedRecord| {
        seen.lock().unwrap().push(record.id.clone());
        Ok(())
    });

    let body = REFUND_BODY.as_bytes();
    let signature = sign(FRONT_SECRET, body);
    processor
        .process_with(ResourceKind::Refund, body, Some(signature.as_str()), Some("submitted"), &handler)
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("j6se0f2o427g28g8yg3u3i".to_string())]
    );
}
