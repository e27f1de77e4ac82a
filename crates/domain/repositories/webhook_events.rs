use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::{
    entities::webhook_events::WebhookEventEntity,
    value_objects::enums::webhook_event_statuses::WebhookEventStatus,
};

/// Idempotency ledger keyed by the payment processor's event id.
pub trait WebhookEventRepository {
    /// Claims the event for processing by inserting a PROCESSING row.
    ///
    /// Returns `false` when a row for this id already exists, unless it is a retryable FAILED
    /// row, which is taken over instead.
    fn claim_webhook_event(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Moves a claimed event to its terminal status.
    fn settle_webhook_event(
        &mut self,
        external_event_id: &str,
        status: WebhookEventStatus,
        outcome: Option<serde_json::Value>,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Records a processing crash as a retryable FAILED row without touching settled events.
    fn record_webhook_failure(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    fn find_webhook_event(&mut self, external_event_id: &str)
    -> Result<Option<WebhookEventEntity>>;
}
