use chrono::{DateTime, Utc};
use crates::domain::{
    entities::devices::DeviceEntity, repositories::LicensingStore,
    value_objects::billing::DeviceHeartbeatDto,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::licensing_errors::{LicensingError, UseCaseResult};

/// Loads the device under lock, treating a device of another tenant as missing.
pub fn lock_owned_device(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    device_id: Uuid,
) -> UseCaseResult<DeviceEntity> {
    store
        .lock_device(device_id)?
        .filter(|device| device.tenant_id == tenant_id)
        .ok_or(LicensingError::DeviceNotFound)
}

/// Marks the device as seen and starts the countdown of its deferred licenses.
///
/// Pending licenses start back to back in purchase order, after any time the device already
/// has running.
pub fn record_heartbeat(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    device_id: Uuid,
    now: DateTime<Utc>,
) -> UseCaseResult<DeviceHeartbeatDto> {
    let device = lock_owned_device(store, tenant_id, device_id)?;
    store.mark_device_seen(device.id, now)?;

    let running_until = store
        .find_latest_running_license(device.id)?
        .map(|license| license.ends_at)
        .filter(|end| *end > now);
    let mut base = running_until.unwrap_or(now);
    let mut licensed_until = running_until;
    let mut started_pending = 0;

    for license in store.list_pending_licenses(device.id)? {
        let Some(license_type) = license.license_type() else {
            warn!(
                %device_id,
                license_id = %license.id,
                license_type = %license.type_,
                "device_activation: pending license has unknown type, left pending"
            );
            continue;
        };

        let ends_at = base + license_type.duration();
        store.start_pending_license(license.id, base, ends_at)?;
        info!(
            %device_id,
            license_id = %license.id,
            starts_at = %base,
            %ends_at,
            "device_activation: deferred license started"
        );

        base = ends_at;
        licensed_until = Some(ends_at);
        started_pending += 1;
    }

    Ok(DeviceHeartbeatDto {
        device_id: device.id,
        licensed_until,
        started_pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{device, run};
    use chrono::Duration;
    use crates::{
        domain::entities::device_licenses::{DeviceLicenseEntity, PENDING_ACTIVATION_NOTE},
        infra::db::memory::licensing::{InMemoryLicensing, LicensingState},
    };

    fn license(
        tenant_id: Uuid,
        device_id: Uuid,
        license_type: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
        pending: bool,
        created_at: DateTime<Utc>,
    ) -> DeviceLicenseEntity {
        DeviceLicenseEntity {
            id: Uuid::new_v4(),
            tenant_id,
            device_id,
            type_: license_type.to_string(),
            status: "ACTIVE".to_string(),
            starts_at: window.0,
            ends_at: window.1,
            source: "STRIPE_CHECKOUT".to_string(),
            note: pending.then(|| PENDING_ACTIVATION_NOTE.to_string()),
            provider_session_ref: None,
            provider_payment_id: None,
            amount_cents: None,
            currency: None,
            purchased_by: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn first_heartbeat_starts_pending_licenses_in_purchase_order() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let fresh = device(tenant_id, None);
        let device_id = fresh.id;
        let bought = now - Duration::days(2);
        let store = InMemoryLicensing::with_state(LicensingState {
            device_licenses: vec![
                license(
                    tenant_id,
                    device_id,
                    "LICENSE_LONG",
                    (bought, bought),
                    true,
                    bought + Duration::hours(1),
                ),
                license(tenant_id, device_id, "LICENSE_SHORT", (bought, bought), true, bought),
            ],
            devices: vec![fresh],
            ..Default::default()
        });

        let heartbeat = run(&store, move |tx| record_heartbeat(tx, tenant_id, device_id, now))
            .await
            .unwrap();

        assert_eq!(heartbeat.started_pending, 2);
        assert_eq!(heartbeat.licensed_until, Some(now + Duration::days(30 + 365)));

        let state = store.snapshot().unwrap();
        assert_eq!(state.devices[0].last_seen_at, Some(now));
        let short = state
            .device_licenses
            .iter()
            .find(|license| license.type_ == "LICENSE_SHORT")
            .unwrap();
        assert_eq!(short.starts_at, now);
        assert_eq!(short.ends_at, now + Duration::days(30));
        assert!(state.device_licenses.iter().all(|license| !license.is_pending()));
    }

    #[tokio::test]
    async fn pending_licenses_queue_behind_running_time() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let online = device(tenant_id, Some(now - Duration::days(1)));
        let device_id = online.id;
        let running_end = now + Duration::days(12);
        let store = InMemoryLicensing::with_state(LicensingState {
            device_licenses: vec![
                license(
                    tenant_id,
                    device_id,
                    "LICENSE_SHORT",
                    (now - Duration::days(18), running_end),
                    false,
                    now - Duration::days(18),
                ),
                license(tenant_id, device_id, "LICENSE_SHORT", (now, now), true, now),
            ],
            devices: vec![online],
            ..Default::default()
        });

        let heartbeat = run(&store, move |tx| record_heartbeat(tx, tenant_id, device_id, now))
            .await
            .unwrap();

        assert_eq!(heartbeat.licensed_until, Some(running_end + Duration::days(30)));
    }

    #[tokio::test]
    async fn heartbeat_without_pending_reports_running_license() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let online = device(tenant_id, Some(now - Duration::days(1)));
        let device_id = online.id;
        let store = InMemoryLicensing::with_state(LicensingState {
            devices: vec![online],
            ..Default::default()
        });

        let heartbeat = run(&store, move |tx| record_heartbeat(tx, tenant_id, device_id, now))
            .await
            .unwrap();

        assert_eq!(heartbeat.started_pending, 0);
        assert_eq!(heartbeat.licensed_until, None);
    }

    #[tokio::test]
    async fn lapsed_license_is_not_reported_as_licensed_until() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let online = device(tenant_id, Some(now - Duration::days(40)));
        let device_id = online.id;
        let started = now - Duration::days(31);
        let store = InMemoryLicensing::with_state(LicensingState {
            device_licenses: vec![license(
                tenant_id,
                device_id,
                "LICENSE_SHORT",
                (started, started + Duration::days(30)),
                false,
                started,
            )],
            devices: vec![online],
            ..Default::default()
        });

        let heartbeat = run(&store, move |tx| record_heartbeat(tx, tenant_id, device_id, now))
            .await
            .unwrap();

        assert_eq!(heartbeat.started_pending, 0);
        assert_eq!(heartbeat.licensed_until, None);
    }

    #[tokio::test]
    async fn heartbeat_from_foreign_tenant_is_rejected() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let online = device(owner, None);
        let device_id = online.id;
        let store = InMemoryLicensing::with_state(LicensingState {
            devices: vec![online],
            ..Default::default()
        });

        let result = run(&store, move |tx| {
            record_heartbeat(tx, Uuid::new_v4(), device_id, now)
        })
        .await;

        assert!(matches!(result, Err(LicensingError::DeviceNotFound)));
        assert_eq!(store.snapshot().unwrap().devices[0].last_seen_at, None);
    }
}
