use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::device_licenses::{DeviceLicenseEntity, InsertDeviceLicenseEntity};

pub trait DeviceLicenseRepository {
    /// ACTIVE, non-pending license of the device with the latest `ends_at`.
    fn find_latest_running_license(
        &mut self,
        device_id: Uuid,
    ) -> Result<Option<DeviceLicenseEntity>>;

    /// ACTIVE licenses still waiting for the device to come online, oldest first.
    fn list_pending_licenses(&mut self, device_id: Uuid) -> Result<Vec<DeviceLicenseEntity>>;

    fn insert_device_license(&mut self, license: InsertDeviceLicenseEntity) -> Result<Uuid>;

    /// Starts the countdown of a pending license and clears its pending marker.
    fn start_pending_license(
        &mut self,
        license_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Newest first.
    fn list_device_licenses(
        &mut self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> Result<Vec<DeviceLicenseEntity>>;
}
