use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    entities::credit_ledger_entries::InsertCreditLedgerEntryEntity,
    repositories::LicensingStore,
    value_objects::{
        entitlements::extend_deadline,
        enums::{
            credit_actions::CreditAction, credit_types::CreditType, ledger_reasons::LedgerReason,
        },
    },
};
use tracing::{debug, info};
use uuid::Uuid;

use super::licensing_errors::{LicensingError, UseCaseResult};

/// Spends one credit of `credit_type` from the soonest-expiring spendable bucket.
///
/// The decrement is guarded by `quantity > 0`. When a concurrent consumer emptied the chosen
/// bucket first, the next bucket in expiry order is tried.
pub fn spend_credit(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    credit_type: CreditType,
    now: DateTime<Utc>,
) -> UseCaseResult<Uuid> {
    let mut drained: Vec<Uuid> = Vec::new();

    loop {
        let Some(bucket) = store.find_soonest_spendable(tenant_id, credit_type, now, &drained)?
        else {
            return Err(if store.has_expired_credits(tenant_id, credit_type, now)? {
                LicensingError::CreditsExpired
            } else {
                LicensingError::NoCredits
            });
        };

        if store.decrement_if_positive(bucket.id, now)? {
            store.append_ledger_entry(InsertCreditLedgerEntryEntity {
                tenant_id,
                type_: credit_type.to_string(),
                delta: -1,
                reason: LedgerReason::CreditConsume.to_string(),
                ref_id: None,
                created_at: now,
            })?;
            return Ok(bucket.id);
        }

        debug!(
            %tenant_id,
            balance_id = %bucket.id,
            "credit_consumption: bucket drained concurrently, trying next"
        );
        drained.push(bucket.id);
    }
}

/// Pushes the tenant's deadline out by `by`, stacking on any time still left.
pub fn extend_entitlement(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    by: Duration,
    now: DateTime<Utc>,
) -> UseCaseResult<DateTime<Utc>> {
    let entitlement = store.lock_entitlement(tenant_id)?;
    let valid_until = extend_deadline(entitlement.valid_until, now, by);
    store.set_valid_until(tenant_id, valid_until, now)?;

    info!(
        %tenant_id,
        previous = ?entitlement.valid_until,
        %valid_until,
        "credit_consumption: entitlement extended"
    );
    Ok(valid_until)
}

/// Spends one credit for `action` and applies its effect to the tenant's entitlement.
pub fn consume_credit(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    action: CreditAction,
    now: DateTime<Utc>,
) -> UseCaseResult<()> {
    let credit_type = action.credit_type();
    let balance_id = spend_credit(store, tenant_id, credit_type, now)?;
    info!(%tenant_id, %action, %balance_id, "credit_consumption: credit spent");

    match credit_type.license_type() {
        Some(license_type) => {
            extend_entitlement(store, tenant_id, license_type.duration(), now)?;
        }
        None => {
            store.increment_max_devices(tenant_id, now)?;
            info!(%tenant_id, "credit_consumption: device slot added");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{Interference, InterferingStore, credit_bucket, run};
    use crates::{
        domain::entities::tenant_entitlements::TenantEntitlementEntity,
        infra::db::memory::licensing::{InMemoryLicensing, LicensingState},
    };

    #[tokio::test]
    async fn spends_the_bucket_closest_to_expiry_first() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let later = credit_bucket(tenant_id, CreditType::LicenseShort, 1, now + Duration::days(20));
        let sooner = credit_bucket(tenant_id, CreditType::LicenseShort, 1, now + Duration::days(5));
        let sooner_id = sooner.id;
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![later, sooner],
            ..Default::default()
        });

        let spent = run(&store, move |tx| {
            spend_credit(tx, tenant_id, CreditType::LicenseShort, now)
        })
        .await
        .unwrap();

        assert_eq!(spent, sooner_id);
        let state = store.snapshot().unwrap();
        let remaining: Vec<i32> = state.credit_balances.iter().map(|b| b.quantity).collect();
        assert_eq!(remaining, vec![1, 0]);
        assert_eq!(state.credit_ledger_entries.len(), 1);
        assert_eq!(state.credit_ledger_entries[0].delta, -1);
        assert_eq!(state.credit_ledger_entries[0].reason, "CREDIT_CONSUME");
    }

    #[tokio::test]
    async fn expired_only_credits_report_credits_expired() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![credit_bucket(
                tenant_id,
                CreditType::LicenseLong,
                3,
                now - Duration::days(1),
            )],
            ..Default::default()
        });

        let result = run(&store, move |tx| {
            consume_credit(tx, tenant_id, CreditAction::ExtendLong, now)
        })
        .await;

        assert!(matches!(result, Err(LicensingError::CreditsExpired)));
        assert_eq!(store.snapshot().unwrap().credit_balances[0].quantity, 3);
    }

    #[tokio::test]
    async fn no_buckets_or_empty_buckets_report_no_credits() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![credit_bucket(
                tenant_id,
                CreditType::LicenseShort,
                0,
                now - Duration::days(1),
            )],
            ..Default::default()
        });

        let empty = run(&store, move |tx| {
            consume_credit(tx, tenant_id, CreditAction::ExtendShort, now)
        })
        .await;
        let other_type = run(&store, move |tx| {
            consume_credit(tx, tenant_id, CreditAction::AddDeviceSlot, now)
        })
        .await;

        assert!(matches!(empty, Err(LicensingError::NoCredits)));
        assert!(matches!(other_type, Err(LicensingError::NoCredits)));
    }

    #[tokio::test]
    async fn extension_adds_to_a_future_deadline() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let mut entitlement = TenantEntitlementEntity::with_defaults(tenant_id, now);
        entitlement.valid_until = Some(now + Duration::days(10));
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![credit_bucket(
                tenant_id,
                CreditType::LicenseShort,
                1,
                now + Duration::days(90),
            )],
            tenant_entitlements: vec![entitlement],
            ..Default::default()
        });

        run(&store, move |tx| {
            consume_credit(tx, tenant_id, CreditAction::ExtendShort, now)
        })
        .await
        .unwrap();

        let state = store.snapshot().unwrap();
        assert_eq!(
            state.tenant_entitlements[0].valid_until,
            Some(now + Duration::days(40))
        );
    }

    #[tokio::test]
    async fn device_slot_raises_the_cap_of_a_new_tenant() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![credit_bucket(
                tenant_id,
                CreditType::DeviceSlot,
                1,
                now + Duration::days(1),
            )],
            ..Default::default()
        });

        run(&store, move |tx| {
            consume_credit(tx, tenant_id, CreditAction::AddDeviceSlot, now)
        })
        .await
        .unwrap();

        let state = store.snapshot().unwrap();
        assert_eq!(state.tenant_entitlements[0].max_devices, 2);
        assert_eq!(state.tenant_entitlements[0].valid_until, None);
    }

    #[tokio::test]
    async fn bucket_emptied_by_a_rival_falls_through_to_the_next() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let sooner = credit_bucket(tenant_id, CreditType::LicenseShort, 1, now + Duration::days(5));
        let later = credit_bucket(tenant_id, CreditType::LicenseShort, 1, now + Duration::days(20));
        let later_id = later.id;
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![sooner, later],
            ..Default::default()
        });

        let spent = run(&store, move |tx| {
            let mut interference = Interference {
                rival_drains: 1,
                ..Default::default()
            };
            let mut contended = InterferingStore::new(tx, &mut interference);
            spend_credit(&mut contended, tenant_id, CreditType::LicenseShort, now)
        })
        .await
        .unwrap();

        assert_eq!(spent, later_id);
        let state = store.snapshot().unwrap();
        assert!(state.credit_balances.iter().all(|bucket| bucket.quantity == 0));
        assert_eq!(state.credit_ledger_entries.len(), 1);
    }

    #[tokio::test]
    async fn last_bucket_emptied_by_a_rival_reports_no_credits() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let store = InMemoryLicensing::with_state(LicensingState {
            credit_balances: vec![credit_bucket(
                tenant_id,
                CreditType::LicenseLong,
                1,
                now + Duration::days(30),
            )],
            ..Default::default()
        });

        let result = run(&store, move |tx| {
            let mut interference = Interference {
                rival_drains: 1,
                ..Default::default()
            };
            let mut contended = InterferingStore::new(tx, &mut interference);
            consume_credit(&mut contended, tenant_id, CreditAction::ExtendLong, now)
        })
        .await;

        assert!(matches!(result, Err(LicensingError::NoCredits)));
        let state = store.snapshot().unwrap();
        assert!(state.credit_ledger_entries.is_empty());
        assert!(state.tenant_entitlements.is_empty());
    }
}
