use anyhow::Result;
use uuid::Uuid;

use crate::domain::entities::credit_ledger_entries::{
    CreditLedgerEntryEntity, InsertCreditLedgerEntryEntity,
};

/// Append-only: there is deliberately no update or delete.
pub trait CreditLedgerRepository {
    fn append_ledger_entry(&mut self, entry: InsertCreditLedgerEntryEntity) -> Result<()>;

    /// Newest first.
    fn list_ledger_entries(&mut self, tenant_id: Uuid) -> Result<Vec<CreditLedgerEntryEntity>>;
}
