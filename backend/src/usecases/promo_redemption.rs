use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{
        credit_ledger_entries::InsertCreditLedgerEntryEntity, promo_codes::PromoCodeEntity,
        promo_redemptions::InsertPromoRedemptionEntity,
    },
    repositories::LicensingStore,
    value_objects::enums::ledger_reasons::LedgerReason,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::licensing_errors::{LicensingError, UseCaseResult};

/// A promo code that passed validation, with the expiry its granted credits will carry.
#[derive(Debug, Clone)]
pub struct ValidatedPromo {
    pub promo: PromoCodeEntity,
    pub credit_expires_at: DateTime<Utc>,
}

/// Looks the code up case-insensitively and checks it can be redeemed at `now`.
pub fn validate_promo(
    store: &mut dyn LicensingStore,
    code: &str,
    now: DateTime<Utc>,
) -> UseCaseResult<ValidatedPromo> {
    let code = code.trim();
    if code.is_empty() {
        return Err(LicensingError::InvalidCode);
    }

    let promo = store
        .find_promo_by_code(code)?
        .ok_or(LicensingError::InvalidCode)?;

    promo.check_redeemable(now).map_err(|rejection| {
        warn!(
            promo_code_id = %promo.id,
            ?rejection,
            "promo_redemption: promo code not redeemable"
        );
        LicensingError::from(rejection)
    })?;

    Ok(ValidatedPromo {
        credit_expires_at: promo.credit_expiry(now),
        promo,
    })
}

/// Redeems `code` for `tenant_id` and grants its credits.
///
/// Must run inside one transaction: the quota increment is conditional on the cap, so when a
/// concurrent redemption took the last slot the error here rolls back the audit row as well.
pub fn redeem_promo(
    store: &mut dyn LicensingStore,
    tenant_id: Uuid,
    code: &str,
    now: DateTime<Utc>,
) -> UseCaseResult<ValidatedPromo> {
    let validated = validate_promo(store, code, now)?;
    let promo_code_id = validated.promo.id;

    store.insert_redemption(InsertPromoRedemptionEntity {
        promo_code_id,
        tenant_id,
        redeemed_at: now,
    })?;

    if !store.increment_redeemed_if_below_cap(promo_code_id)? {
        warn!(
            %tenant_id,
            %promo_code_id,
            "promo_redemption: last slot taken by a concurrent redemption"
        );
        return Err(LicensingError::CodeLimitReached);
    }

    for (credit_type, quantity) in validated.promo.grants() {
        store.add_to_bucket(
            tenant_id,
            credit_type,
            validated.credit_expires_at,
            quantity,
            now,
        )?;
        store.append_ledger_entry(InsertCreditLedgerEntryEntity {
            tenant_id,
            type_: credit_type.to_string(),
            delta: quantity,
            reason: LedgerReason::CouponRedeem.to_string(),
            ref_id: Some(promo_code_id),
            created_at: now,
        })?;
    }

    info!(
        %tenant_id,
        %promo_code_id,
        expires_at = %validated.credit_expires_at,
        "promo_redemption: credits granted"
    );
    Ok(validated)
}
