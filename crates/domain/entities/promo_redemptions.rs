use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::promo_redemptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = promo_redemptions)]
pub struct PromoRedemptionEntity {
    pub id: Uuid,
    pub promo_code_id: Uuid,
    pub tenant_id: Uuid,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = promo_redemptions)]
pub struct InsertPromoRedemptionEntity {
    pub promo_code_id: Uuid,
    pub tenant_id: Uuid,
    pub redeemed_at: DateTime<Utc>,
}
