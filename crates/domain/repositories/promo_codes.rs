use anyhow::Result;
use uuid::Uuid;

use crate::domain::entities::{
    promo_codes::PromoCodeEntity, promo_redemptions::InsertPromoRedemptionEntity,
};

pub trait PromoCodeRepository {
    /// Case-insensitive lookup by code.
    fn find_promo_by_code(&mut self, code: &str) -> Result<Option<PromoCodeEntity>>;

    /// Increments `redeemed_count` only while it is below `max_redemptions`.
    /// Returns `false` when the cap was already reached, leaving the row untouched.
    fn increment_redeemed_if_below_cap(&mut self, promo_code_id: Uuid) -> Result<bool>;

    fn insert_redemption(&mut self, redemption: InsertPromoRedemptionEntity) -> Result<Uuid>;
}
