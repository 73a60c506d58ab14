//! Webhook Event Types
//!
//! Typed representations of GOV.UK Pay webhook deliveries and of the
//! normalized record extracted from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WebhookError, WebhookResult};
use crate::webhook::transition::TransitionTable;
use crate::webhook::{payment, refund};

/// The resource a webhook reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A card payment
    Payment,
    /// A refund against a payment
    Refund,
}

impl ResourceKind {
    /// Label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Refund => "refund",
        }
    }

    /// Legal status transitions for this kind
    pub fn transitions(&self) -> &'static TransitionTable {
        match self {
            Self::Payment => &payment::PAYMENT_TRANSITIONS,
            Self::Refund => &refund::REFUND_TRANSITIONS,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "payment" => Ok(Self::Payment),
            "refund" => Ok(Self::Refund),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

/// A single webhook delivery, consumed within one call
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    kind: ResourceKind,
    payload: Value,
}

impl WebhookEvent {
    /// Wrap an already parsed payload
    pub fn new(kind: ResourceKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Parse from raw JSON bytes
    pub fn from_slice(kind: ResourceKind, body: &[u8]) -> WebhookResult<Self> {
        let payload = serde_json::from_slice(body).map_err(|e| {
            WebhookError::shape(format!("Invalid {kind} webhook: body is not valid JSON ({e})"))
        })?;
        Ok(Self::new(kind, payload))
    }

    /// The resource kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The raw payload
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Text at a JSON pointer, with numbers and booleans rendered as text
    pub fn text_at(&self, pointer: &str) -> Option<String> {
        self.payload.pointer(pointer).and_then(scalar_string)
    }

    /// Like [`text_at`](Self::text_at), but blank strings count as absent
    pub fn non_blank_at(&self, pointer: &str) -> Option<String> {
        self.text_at(pointer).filter(|s| !s.trim().is_empty())
    }

    /// Integer at a JSON pointer
    pub fn integer_at(&self, pointer: &str) -> Option<i64> {
        self.payload.pointer(pointer).and_then(Value::as_i64)
    }

    /// First non-blank text among several pointers
    pub fn first_non_blank(&self, pointers: &[&str]) -> Option<String> {
        pointers.iter().find_map(|p| self.non_blank_at(p))
    }

    /// Whether the value at `pointer` is present and neither `null` nor `false`
    pub fn is_truthy_at(&self, pointer: &str) -> bool {
        !matches!(
            self.payload.pointer(pointer),
            None | Some(Value::Null) | Some(Value::Bool(false))
        )
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Which office initiated the payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Citizen-initiated
    FrontOffice,
    /// Mail order / telephone order taken by staff
    BackOffice,
}

impl ServiceType {
    /// Classify from the MOTO marker
    pub fn from_moto(moto: bool) -> Self {
        if moto {
            Self::BackOffice
        } else {
            Self::FrontOffice
        }
    }

    /// snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontOffice => "front_office",
            Self::BackOffice => "back_office",
        }
    }
}

/// Refund availability reported alongside a payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundSummary {
    /// `available`, `unavailable`, `full`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// Amount still refundable, in pence
    #[serde(default)]
    pub amount_available: Option<i64>,
    /// Amount already submitted for refund, in pence
    #[serde(default)]
    pub amount_submitted: Option<i64>,
}

/// Payment-specific extracted fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentFields {
    /// Amount in pence
    pub amount: Option<i64>,
    /// Service-supplied description
    pub description: Option<String>,
    /// Service-supplied reference
    pub reference: Option<String>,
    /// When the payment was created (ISO 8601)
    pub created_date: Option<String>,
    /// Mail order / telephone order marker
    pub moto: bool,
    /// Refund availability, if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_summary: Option<RefundSummary>,
}

/// Refund-specific extracted fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefundFields {
    /// The payment being refunded
    pub payment_id: Option<String>,
    /// Amount in pence
    pub amount: Option<i64>,
    /// When the refund was created (ISO 8601)
    pub created_date: Option<String>,
}

/// Resource-specific part of an [`ExtractedRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourceFields {
    /// Fields of a payment webhook
    Payment(PaymentFields),
    /// Fields of a refund webhook
    Refund(RefundFields),
}

/// Normalized, PII-free output of a processed webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    /// Payment or refund identifier
    pub id: Option<String>,
    /// Status carried by the webhook
    pub status: String,
    /// Front or back office
    pub service_type: ServiceType,
    /// Resource-specific fields
    #[serde(flatten)]
    pub fields: ResourceFields,
}

impl ExtractedRecord {
    /// The resource kind this record was extracted for
    pub fn kind(&self) -> ResourceKind {
        match self.fields {
            ResourceFields::Payment(_) => ResourceKind::Payment,
            ResourceFields::Refund(_) => ResourceKind::Refund,
        }
    }

    /// Payment fields, if this is a payment record
    pub fn payment(&self) -> Option<&PaymentFields> {
        match &self.fields {
            ResourceFields::Payment(fields) => Some(fields),
            ResourceFields::Refund(_) => None,
        }
    }

    /// Refund fields, if this is a refund record
    pub fn refund(&self) -> Option<&RefundFields> {
        match &self.fields {
            ResourceFields::Refund(fields) => Some(fields),
            ResourceFields::Payment(_) => None,
        }
    }

    /// Parsed creation timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = match &self.fields {
            ResourceFields::Payment(fields) => fields.created_date.as_deref(),
            ResourceFields::Refund(fields) => fields.created_date.as_deref(),
        }?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the status is terminal for this kind
    pub fn is_terminal(&self) -> bool {
        self.kind().transitions().is_terminal(&self.status)
    }
}
