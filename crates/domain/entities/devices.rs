use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{device_credentials, devices};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = devices)]
pub struct DeviceEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub status: String,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeviceEntity {
    /// A device that has never reported activity still has its license countdown on hold.
    pub fn has_been_online(&self) -> bool {
        self.last_seen_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = device_credentials)]
pub struct DeviceCredentialEntity {
    pub id: Uuid,
    pub device_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
