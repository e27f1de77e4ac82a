use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::credit_balances::CreditBalanceEntity,
    value_objects::enums::credit_types::CreditType,
};

pub trait CreditBalanceRepository {
    /// Creates the `(tenant, type, expires_at)` bucket or adds `quantity` to the existing one.
    fn add_to_bucket(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        expires_at: DateTime<Utc>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Soonest-expiring bucket with `quantity > 0` and `expires_at >= now`, skipping `exclude`.
    fn find_soonest_spendable(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Option<CreditBalanceEntity>>;

    /// Whether any bucket of this type still holds credits that expired before `now`.
    fn has_expired_credits(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Takes one unit from the bucket only if it still holds one. Returns `false` otherwise.
    fn decrement_if_positive(&mut self, balance_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Non-expired, non-empty buckets ordered by expiry.
    fn list_spendable(
        &mut self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditBalanceEntity>>;
}
