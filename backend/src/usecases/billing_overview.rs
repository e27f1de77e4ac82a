use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    repositories::LicensingStore,
    value_objects::{
        billing::{
            BillingOverviewDto, CreditBalanceDto, EXPIRING_SOON_DAYS, EntitlementSnapshotDto,
            ExpiringSoonDto,
        },
        entitlements::is_active,
    },
};
use uuid::Uuid;

/// Tenant-facing snapshot of entitlement, spendable credits and credits about to lapse.
///
/// Only writes the default entitlement row when the tenant has none yet.
pub fn assemble_overview(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<BillingOverviewDto> {
    let entitlement = store.ensure_entitlement(tenant_id)?;
    let active_devices = store.count_active_devices(tenant_id)?;
    let credits = store.list_spendable(tenant_id, now)?;

    let horizon = now + Duration::days(EXPIRING_SOON_DAYS);
    let expiring_soon: i64 = credits
        .iter()
        .filter(|bucket| bucket.expires_at <= horizon)
        .map(|bucket| i64::from(bucket.quantity))
        .sum();

    Ok(BillingOverviewDto {
        entitlement: EntitlementSnapshotDto {
            valid_until: entitlement.valid_until,
            is_active: is_active(entitlement.valid_until, now),
            max_devices: entitlement.max_devices,
            active_devices,
        },
        credits: credits.into_iter().map(CreditBalanceDto::from).collect(),
        expiring_soon: ExpiringSoonDto {
            count: expiring_soon,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{credit_bucket, device, run};
    use crates::{
        domain::{
            entities::devices::DeviceCredentialEntity,
            value_objects::enums::{
                credit_types::CreditType,
                device_statuses::{CredentialStatus, DeviceStatus},
            },
        },
        infra::db::memory::licensing::{InMemoryLicensing, LicensingState},
    };

    #[tokio::test]
    async fn new_tenant_gets_default_entitlement() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::new();

        let overview = run(&store, move |tx| Ok(assemble_overview(tx, tenant_id, now)?))
            .await
            .unwrap();

        assert_eq!(overview.entitlement.valid_until, None);
        assert!(!overview.entitlement.is_active);
        assert_eq!(overview.entitlement.max_devices, 1);
        assert_eq!(overview.entitlement.active_devices, 0);
        assert!(overview.credits.is_empty());
        assert_eq!(overview.expiring_soon.count, 0);
        assert_eq!(store.snapshot().unwrap().tenant_entitlements.len(), 1);
    }

    #[tokio::test]
    async fn lists_spendable_credits_and_counts_those_expiring_soon() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![
                credit_bucket(tenant_id, CreditType::LicenseLong, 4, now + Duration::days(200)),
                credit_bucket(tenant_id, CreditType::LicenseShort, 2, now + Duration::days(10)),
                credit_bucket(tenant_id, CreditType::DeviceSlot, 3, now + Duration::days(29)),
                credit_bucket(tenant_id, CreditType::LicenseShort, 0, now + Duration::days(5)),
                credit_bucket(tenant_id, CreditType::LicenseShort, 7, now - Duration::days(1)),
                credit_bucket(Uuid::new_v4(), CreditType::LicenseShort, 9, now + Duration::days(1)),
            ],
            ..Default::default()
        });

        let overview = run(&store, move |tx| Ok(assemble_overview(tx, tenant_id, now)?))
            .await
            .unwrap();

        let types: Vec<&str> = overview
            .credits
            .iter()
            .map(|credit| credit.credit_type.as_str())
            .collect();
        assert_eq!(types, vec!["LICENSE_SHORT", "DEVICE_SLOT", "LICENSE_LONG"]);
        assert_eq!(overview.expiring_soon.count, 5);
    }

    #[tokio::test]
    async fn counts_only_active_devices_with_active_credentials() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let online = device(tenant_id, Some(now));
        let revoked = device(tenant_id, Some(now));
        let mut inactive = device(tenant_id, Some(now));
        inactive.status = DeviceStatus::Inactive.to_string();

        let credential = |device_id, status: CredentialStatus| DeviceCredentialEntity {
            id: Uuid::new_v4(),
            device_id,
            status: status.to_string(),
            created_at: now,
        };
        let store = InMemoryLicensing::with_state(LicensingState {
            device_credentials: vec![
                credential(online.id, CredentialStatus::Active),
                credential(revoked.id, CredentialStatus::Revoked),
                credential(inactive.id, CredentialStatus::Active),
            ],
            devices: vec![online, revoked, inactive],
            ..Default::default()
        });

        let overview = run(&store, move |tx| Ok(assemble_overview(tx, tenant_id, now)?))
            .await
            .unwrap();

        assert_eq!(overview.entitlement.active_devices, 1);
    }

    #[test]
    fn overview_serializes_with_camel_case_keys() {
        let overview = BillingOverviewDto {
            entitlement: EntitlementSnapshotDto {
                valid_until: None,
                is_active: false,
                max_devices: 1,
                active_devices: 0,
            },
            credits: vec![],
            expiring_soon: ExpiringSoonDto { count: 0 },
        };

        let json = serde_json::to_value(&overview).unwrap();

        assert!(json["entitlement"].get("maxDevices").is_some());
        assert!(json["entitlement"].get("activeDevices").is_some());
        assert!(json["entitlement"].get("isActive").is_some());
        assert!(json.get("expiringSoon").is_some());
    }
}
