use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::tenant_entitlements;

pub const DEFAULT_MAX_DEVICES: i32 = 1;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = tenant_entitlements, primary_key(tenant_id))]
pub struct TenantEntitlementEntity {
    pub tenant_id: Uuid,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_devices: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantEntitlementEntity {
    pub fn with_defaults(tenant_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            valid_until: None,
            max_devices: DEFAULT_MAX_DEVICES,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tenant_entitlements)]
pub struct InsertTenantEntitlementEntity {
    pub tenant_id: Uuid,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_devices: i32,
}
