use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::credit_balances;

/// One spendable bucket: all credits of a type for a tenant that share the same expiry.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = credit_balances)]
pub struct CreditBalanceEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub type_: String,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditBalanceEntity {
    pub fn is_spendable(&self, now: DateTime<Utc>) -> bool {
        self.quantity > 0 && self.expires_at >= now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_balances)]
pub struct InsertCreditBalanceEntity {
    pub tenant_id: Uuid,
    pub type_: String,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
