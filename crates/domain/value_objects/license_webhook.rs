use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a processed license purchase, stored as the webhook event's `outcome`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LicensePurchaseOutcome {
    pub device_license_id: Uuid,
    pub device_id: Uuid,
    pub tenant_id: Uuid,
    pub license_type: String,
    pub deferred: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// How one delivery of a payment event was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    /// The event id was already settled (or is being settled by a concurrent delivery).
    Duplicate,
    /// Not an event type this service acts on.
    Ignored { event_type: String },
    /// Permanently unprocessable; recorded as FAILED and acknowledged.
    Rejected { reason: String },
    Processed(LicensePurchaseOutcome),
}
