use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::webhook_event_statuses::WebhookEventStatus,
    infra::db::postgres::schema::webhook_events,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = webhook_events)]
pub struct WebhookEventEntity {
    pub id: Uuid,
    pub external_event_id: String,
    pub type_: String,
    pub status: String,
    pub payload: serde_json::Value,
    pub outcome: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub retryable: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookEventEntity {
    pub fn status(&self) -> Option<WebhookEventStatus> {
        WebhookEventStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_events)]
pub struct InsertWebhookEventEntity {
    pub external_event_id: String,
    pub type_: String,
    pub status: String,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub retryable: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
