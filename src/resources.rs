//! Gateway resources
//!
//! Value objects for payment and refund bodies returned by the gateway API.
//! Only the members the crate reasons about are typed; unknown members are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

use crate::webhook::events::RefundSummary;

/// `state` object of a payment or refund
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Current status
    #[serde(default)]
    pub status: String,
    /// Whether the status is final
    #[serde(default)]
    pub finished: bool,
}

/// A payment as returned by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier
    pub payment_id: String,
    /// Amount in pence
    #[serde(default)]
    pub amount: i64,
    /// Service-supplied description
    #[serde(default)]
    pub description: Option<String>,
    /// Service-supplied reference
    #[serde(default)]
    pub reference: Option<String>,
    /// Current state
    #[serde(default)]
    pub state: ResourceState,
    /// Mail order / telephone order marker
    #[serde(default)]
    pub moto: bool,
    /// When the payment was created (ISO 8601)
    #[serde(default)]
    pub created_date: Option<String>,
    /// Refund availability
    #[serde(default)]
    pub refund_summary: Option<RefundSummary>,
}

impl Payment {
    /// Current status
    pub fn status(&self) -> &str {
        &self.state.status
    }

    /// Whether `amount_requested` (pence) can still be refunded
    ///
    /// Requires the refund summary to be `available`, some amount not yet
    /// submitted for refund, and the request to fit within what is
    /// available. Payments without a complete summary are not refundable.
    pub fn is_refundable(&self, amount_requested: i64) -> bool {
        let Some(summary) = &self.refund_summary else {
            return false;
        };
        let (Some(available), Some(submitted)) = (summary.amount_available, summary.amount_submitted)
        else {
            return false;
        };

        summary.status.as_deref() == Some("available")
            && available > submitted
            && amount_requested <= available
    }
}

/// A refund as returned by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    /// Refund identifier
    pub refund_id: String,
    /// Amount in pence
    #[serde(default)]
    pub amount: i64,
    /// `submitted`, `success` or `error`
    #[serde(default)]
    pub status: String,
    /// When the refund was created (ISO 8601)
    #[serde(default)]
    pub created_date: Option<String>,
}

impl Refund {
    /// The refund went through
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// The refund is still being processed
    pub fn is_submitted(&self) -> bool {
        self.status == "submitted"
    }
}
