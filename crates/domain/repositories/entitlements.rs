use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::tenant_entitlements::TenantEntitlementEntity;

pub trait EntitlementRepository {
    /// Returns the tenant's row, creating it with defaults on first access.
    fn ensure_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity>;

    /// Like [`ensure_entitlement`](Self::ensure_entitlement) but holds a row lock until the
    /// surrounding transaction ends, so read-modify-write of `valid_until` cannot lose updates.
    fn lock_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity>;

    fn set_valid_until(
        &mut self,
        tenant_id: Uuid,
        valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    fn increment_max_devices(&mut self, tenant_id: Uuid, now: DateTime<Utc>) -> Result<()>;
}
