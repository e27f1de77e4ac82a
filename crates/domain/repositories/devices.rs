use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::devices::DeviceEntity;

pub trait DeviceRepository {
    fn find_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>>;

    /// Loads the device and locks it for the rest of the transaction.
    fn lock_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>>;

    fn mark_device_seen(&mut self, device_id: Uuid, seen_at: DateTime<Utc>) -> Result<()>;

    /// Devices with ACTIVE status that also hold an ACTIVE credential.
    fn count_active_devices(&mut self, tenant_id: Uuid) -> Result<i64>;
}
