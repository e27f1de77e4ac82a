use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::credit_types::CreditType,
    infra::db::postgres::schema::promo_codes,
};

/// Credit lifetime used when a promo code leaves `credit_expires_in_days` unset or zero.
pub const DEFAULT_CREDIT_EXPIRY_DAYS: i32 = 365;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = promo_codes)]
pub struct PromoCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_redemptions: i32,
    pub redeemed_count: i32,
    pub grant_license_short: i32,
    pub grant_license_long: i32,
    pub grant_device_slots: i32,
    pub credit_expires_in_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Why a promo code cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    Inactive,
    OutsideValidityWindow,
    LimitReached,
}

impl PromoCodeEntity {
    /// Checks the active flag, the `[valid_from, valid_until]` window (missing bounds are open)
    /// and the remaining quota, in that order.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }

        let started = self.valid_from.is_none_or(|from| now >= from);
        let not_ended = self.valid_until.is_none_or(|until| now <= until);
        if !started || !not_ended {
            return Err(PromoRejection::OutsideValidityWindow);
        }

        if self.redeemed_count >= self.max_redemptions {
            return Err(PromoRejection::LimitReached);
        }

        Ok(())
    }

    pub fn credit_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = match self.credit_expires_in_days {
            Some(days) if days > 0 => days,
            _ => DEFAULT_CREDIT_EXPIRY_DAYS,
        };
        now + Duration::days(days.into())
    }

    /// Non-zero credit grants, in the order they are written to the ledger.
    pub fn grants(&self) -> Vec<(CreditType, i32)> {
        [
            (CreditType::LicenseShort, self.grant_license_short),
            (CreditType::LicenseLong, self.grant_license_long),
            (CreditType::DeviceSlot, self.grant_device_slots),
        ]
        .into_iter()
        .filter(|(_, quantity)| *quantity > 0)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_promo(now: DateTime<Utc>) -> PromoCodeEntity {
        PromoCodeEntity {
            id: Uuid::new_v4(),
            code: "LAUNCH".to_string(),
            active: true,
            valid_from: None,
            valid_until: None,
            max_redemptions: 3,
            redeemed_count: 0,
            grant_license_short: 1,
            grant_license_long: 0,
            grant_device_slots: 2,
            credit_expires_in_days: Some(30),
            created_at: now,
        }
    }

    #[test]
    fn inactive_code_is_rejected_before_window_and_quota() {
        let now = Utc::now();
        let mut promo = sample_promo(now);
        promo.active = false;
        promo.redeemed_count = promo.max_redemptions;

        assert_eq!(promo.check_redeemable(now), Err(PromoRejection::Inactive));
    }

    #[test]
    fn validity_window_bounds_are_inclusive_and_open_when_missing() {
        let now = Utc::now();
        let mut promo = sample_promo(now);

        promo.valid_from = Some(now);
        promo.valid_until = Some(now);
        assert_eq!(promo.check_redeemable(now), Ok(()));

        promo.valid_from = Some(now + Duration::seconds(1));
        promo.valid_until = None;
        assert_eq!(
            promo.check_redeemable(now),
            Err(PromoRejection::OutsideValidityWindow)
        );

        promo.valid_from = None;
        promo.valid_until = Some(now - Duration::seconds(1));
        assert_eq!(
            promo.check_redeemable(now),
            Err(PromoRejection::OutsideValidityWindow)
        );
    }

    #[test]
    fn exhausted_quota_is_rejected() {
        let now = Utc::now();
        let mut promo = sample_promo(now);
        promo.redeemed_count = 3;

        assert_eq!(promo.check_redeemable(now), Err(PromoRejection::LimitReached));
    }

    #[test]
    fn credit_expiry_falls_back_to_a_year() {
        let now = Utc::now();
        let mut promo = sample_promo(now);
        assert_eq!(promo.credit_expiry(now), now + Duration::days(30));

        promo.credit_expires_in_days = Some(0);
        assert_eq!(promo.credit_expiry(now), now + Duration::days(365));

        promo.credit_expires_in_days = None;
        assert_eq!(promo.credit_expiry(now), now + Duration::days(365));
    }

    #[test]
    fn grants_skip_zero_quantities() {
        let promo = sample_promo(Utc::now());

        assert_eq!(
            promo.grants(),
            vec![(CreditType::LicenseShort, 1), (CreditType::DeviceSlot, 2)]
        );
    }
}
