//! Status transition validation
//!
//! Each resource kind owns an immutable [`TransitionTable`]. A webhook may
//! only move a resource from the status the caller last recorded to one of
//! that status's allowed successors. Anything else is a regression, a replay
//! or an out-of-order delivery and is refused.
//!
//! ```text
//! payload ──▶ validate_shape ──▶ previous == current? ──yes──▶ warn, continue
//!                                      │ no
//!                                      ▼
//!                              table.permits(prev, current)? ──no──▶ InvalidStatusTransition
//!                                      │ yes
//!                                      ▼
//!                               ExtractedRecord
//! ```

use tracing::{debug, warn};

use crate::error::{WebhookError, WebhookResult};
use crate::webhook::events::{ExtractedRecord, ResourceFields, ServiceType, WebhookEvent};

/// Immutable map from a status to the statuses it may advance to
///
/// Every reachable status appears as a key; terminal statuses map to an
/// empty slice.
#[derive(Debug)]
pub struct TransitionTable {
    resource: &'static str,
    edges: &'static [(&'static str, &'static [&'static str])],
}

impl TransitionTable {
    /// Build a table from static edges
    pub const fn new(
        resource: &'static str,
        edges: &'static [(&'static str, &'static [&'static str])],
    ) -> Self {
        Self { resource, edges }
    }

    /// Label of the resource this table governs
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Allowed successors of `status`, or `None` for an unknown status
    pub fn allowed_from(&self, status: &str) -> Option<&'static [&'static str]> {
        self.edges
            .iter()
            .find(|(from, _)| *from == status)
            .map(|(_, next)| *next)
    }

    /// Whether `from → to` is a legal transition
    pub fn permits(&self, from: &str, to: &str) -> bool {
        self.allowed_from(from)
            .is_some_and(|next| next.contains(&to))
    }

    /// The table's own `&'static` spelling of `status`, if it appears
    pub fn known_status(&self, status: &str) -> Option<&'static str> {
        self.statuses().find(|known| *known == status)
    }

    /// Whether `status` is known and has no successors
    pub fn is_terminal(&self, status: &str) -> bool {
        self.allowed_from(status).is_some_and(<[_]>::is_empty)
    }

    /// All statuses, in declaration order
    pub fn statuses(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edges.iter().map(|(status, _)| *status)
    }

    /// Statuses with no successors
    pub fn terminal_statuses(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edges
            .iter()
            .filter(|(_, next)| next.is_empty())
            .map(|(status, _)| *status)
    }

    /// Fail with [`WebhookError::InvalidStatusTransition`] unless `from → to` is legal
    pub fn check(&self, from: &str, to: &str, id: Option<&str>) -> WebhookResult<()> {
        if self.permits(from, to) {
            return Ok(());
        }
        Err(WebhookError::InvalidStatusTransition {
            resource: self.resource,
            from: from.to_string(),
            to: to.to_string(),
            id: id.map(str::to_string),
        })
    }
}

/// Per-kind behaviour plugged into [`apply`]
pub trait WebhookResource {
    /// Label used in diagnostics ("payment", "refund")
    fn resource_label(&self) -> &'static str;

    /// The kind's transition table
    fn transitions(&self) -> &'static TransitionTable;

    /// Reject malformed payloads with [`WebhookError::Shape`]
    fn validate_shape(&self, event: &WebhookEvent) -> WebhookResult<()>;

    /// Resource identifier
    fn extract_id(&self, event: &WebhookEvent) -> Option<String>;

    /// Status carried by the webhook
    fn extract_status(&self, event: &WebhookEvent) -> Option<String>;

    /// Kind-specific normalized fields
    fn extract_fields(&self, event: &WebhookEvent) -> ResourceFields;

    /// Back office iff the resource carries a truthy MOTO marker
    fn service_type(&self, event: &WebhookEvent) -> ServiceType {
        ServiceType::from_moto(event.is_truthy_at("/resource/moto"))
    }
}

/// Validate a webhook and extract its record
///
/// `previous_status` is the status the caller last recorded for this
/// resource. When it equals the webhook's status the delivery is treated as
/// an idempotent re-delivery: a warning is logged and the record is still
/// returned.
///
/// # Errors
///
/// [`WebhookError::Shape`] for malformed payloads and
/// [`WebhookError::InvalidStatusTransition`] for refused transitions.
pub fn apply<R>(
    resource: &R,
    event: &WebhookEvent,
    previous_status: Option<&str>,
) -> WebhookResult<ExtractedRecord>
where
    R: WebhookResource + ?Sized,
{
    let label = resource.resource_label();

    resource.validate_shape(event)?;

    let id = resource.extract_id(event);
    let status = resource.extract_status(event).ok_or_else(|| {
        WebhookError::shape(format!("Webhook body missing {label} status"))
    })?;

    match previous_status {
        Some(previous) if previous == status => {
            warn!(
                resource = label,
                id = id.as_deref().unwrap_or("unknown"),
                status = %status,
                "Status \"{}\" unchanged in {} webhook update",
                previous,
                label
            );
        }
        Some(previous) => {
            resource
                .transitions()
                .check(previous, &status, id.as_deref())
                .map_err(|e| {
                    warn!(
                        resource = label,
                        id = id.as_deref().unwrap_or("unknown"),
                        previous_status = previous,
                        status = %status,
                        "Refused {} status transition",
                        label
                    );
                    e
                })?;
        }
        None => {
            debug!(
                resource = label,
                id = id.as_deref().unwrap_or("unknown"),
                status = %status,
                "No previous status supplied; skipping transition check"
            );
        }
    }

    Ok(ExtractedRecord {
        id,
        status,
        service_type: resource.service_type(event),
        fields: resource.extract_fields(event),
    })
}
