use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::credit_ledger_entries;

/// Append-only audit row; never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = credit_ledger_entries)]
pub struct CreditLedgerEntryEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub type_: String,
    pub delta: i32,
    pub reason: String,
    pub ref_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_ledger_entries)]
pub struct InsertCreditLedgerEntryEntity {
    pub tenant_id: Uuid,
    pub type_: String,
    pub delta: i32,
    pub reason: String,
    pub ref_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
