use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::license_types::LicenseType,
    infra::db::postgres::schema::device_licenses,
};

/// Note written on licenses bought for a device that has never been online.
pub const PENDING_ACTIVATION_NOTE: &str = "PENDING_ACTIVATION";

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = device_licenses)]
pub struct DeviceLicenseEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub device_id: Uuid,
    pub type_: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub source: String,
    pub note: Option<String>,
    pub provider_session_ref: Option<String>,
    pub provider_payment_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub purchased_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DeviceLicenseEntity {
    pub fn is_pending(&self) -> bool {
        self.note.as_deref() == Some(PENDING_ACTIVATION_NOTE)
    }

    pub fn license_type(&self) -> Option<LicenseType> {
        LicenseType::from_str(&self.type_)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = device_licenses)]
pub struct InsertDeviceLicenseEntity {
    pub tenant_id: Uuid,
    pub device_id: Uuid,
    pub type_: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub source: String,
    pub note: Option<String>,
    pub provider_session_ref: Option<String>,
    pub provider_payment_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub purchased_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
