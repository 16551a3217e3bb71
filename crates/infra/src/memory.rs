//! In-memory backend for tests/dev.
//!
//! A unit of work holds an owned lock over the whole state and mutates a
//! private copy; `commit` swaps the copy in, dropping it discards the copy.
//! Transactions therefore run one at a time (serializable), which is the
//! simplest model that cannot lose an update. Not optimized for performance.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use stockpost_accounting::{Account, JournalEntry};
use stockpost_core::{AccountId, ProductVariantId, TenantId};
use stockpost_inventory::{Batch, Movement, StockKey, StockRecord};
use stockpost_sales::Order;

use crate::error::StoreError;
use crate::outbox::OutboxMessage;
use crate::uow::{Database, UnitOfWork};

/// Full contents of the in-memory database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub stock: BTreeMap<(TenantId, StockKey), StockRecord>,
    pub batches: HashMap<(TenantId, ProductVariantId, String), Batch>,
    pub accounts: HashMap<(TenantId, AccountId), Account>,
    pub movements: Vec<Movement>,
    pub journal_entries: Vec<JournalEntry>,
    pub orders: Vec<Order>,
    pub outbox: Vec<OutboxMessage>,
}

impl LedgerState {
    pub fn quantity(&self, tenant_id: TenantId, key: StockKey) -> Option<rust_decimal::Decimal> {
        self.stock.get(&(tenant_id, key)).map(|r| r.quantity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chart-of-accounts seeding hook (stands in for the provisioning process).
    pub async fn provision_account(&self, account: Account) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let duplicate = state
            .accounts
            .values()
            .any(|a| a.tenant_id == account.tenant_id && a.code == account.code);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "account code '{}' already provisioned",
                account.code
            )));
        }
        state.accounts.insert((account.tenant_id, account.id), account);
        Ok(())
    }

    /// Point-in-time copy of everything committed so far.
    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }
}

/// In-memory unit of work.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_stock(
        &mut self,
        tenant_id: TenantId,
        key: StockKey,
    ) -> Result<Option<StockRecord>, StoreError> {
        Ok(self.working.stock.get(&(tenant_id, key)).cloned())
    }

    async fn save_stock(&mut self, record: &StockRecord) -> Result<(), StoreError> {
        self.working
            .stock
            .insert((record.tenant_id, record.key), record.clone());
        Ok(())
    }

    async fn lock_variant_stock(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let mut records: Vec<StockRecord> = self
            .working
            .stock
            .iter()
            .filter(|((t, k), _)| *t == tenant_id && k.variant_id == variant_id)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.key.cmp(&b.key)));
        Ok(records)
    }

    async fn find_batch(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
        code: &str,
    ) -> Result<Option<Batch>, StoreError> {
        Ok(self
            .working
            .batches
            .get(&(tenant_id, variant_id, code.to_string()))
            .cloned())
    }

    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), StoreError> {
        let key = (batch.tenant_id, batch.variant_id, batch.code.clone());
        if self.working.batches.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "batch '{}' already exists for variant",
                batch.code
            )));
        }
        self.working.batches.insert(key, batch.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), StoreError> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn find_account(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.get(&(tenant_id, account_id)).cloned())
    }

    async fn find_account_by_code(
        &mut self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|a| a.tenant_id == tenant_id && a.code == code)
            .cloned())
    }

    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError> {
        self.working.journal_entries.push(entry.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn enqueue(&mut self, message: &OutboxMessage) -> Result<(), StoreError> {
        self.working.outbox.push(message.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork { guard, working })
    }

    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .outbox
            .iter()
            .filter(|m| m.delivered_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for message in state.outbox.iter_mut().filter(|m| ids.contains(&m.id)) {
            message.delivered_at = Some(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockpost_core::WarehouseId;

    fn record(tenant_id: TenantId, key: StockKey, qty: rust_decimal::Decimal) -> StockRecord {
        StockRecord {
            tenant_id,
            key,
            quantity: qty,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let db = InMemoryDatabase::new();
        let tenant_id = TenantId::new();
        let key = StockKey::new(WarehouseId::new(), ProductVariantId::new(), None);

        let mut uow = db.begin().await.unwrap();
        uow.save_stock(&record(tenant_id, key, dec!(5))).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(db.snapshot().await.quantity(tenant_id, key), Some(dec!(5)));
    }

    #[tokio::test]
    async fn dropped_scope_discards_writes() {
        let db = InMemoryDatabase::new();
        let tenant_id = TenantId::new();
        let key = StockKey::new(WarehouseId::new(), ProductVariantId::new(), None);

        {
            let mut uow = db.begin().await.unwrap();
            uow.save_stock(&record(tenant_id, key, dec!(5))).await.unwrap();
        }
        let mut uow = db.begin().await.unwrap();
        uow.save_stock(&record(tenant_id, key, dec!(7))).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(db.snapshot().await.quantity(tenant_id, key), None);
    }

    #[tokio::test]
    async fn untracked_and_batched_keys_are_distinct() {
        let db = InMemoryDatabase::new();
        let tenant_id = TenantId::new();
        let w = WarehouseId::new();
        let v = ProductVariantId::new();
        let plain = StockKey::new(w, v, None);
        let batched = StockKey::new(w, v, Some(stockpost_core::BatchId::new()));

        let mut uow = db.begin().await.unwrap();
        uow.save_stock(&record(tenant_id, batched, dec!(3))).await.unwrap();
        assert!(uow.lock_stock(tenant_id, plain).await.unwrap().is_none());
        assert_eq!(uow.lock_variant_stock(tenant_id, v).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_account_codes_are_rejected() {
        use stockpost_accounting::AccountKind;

        let db = InMemoryDatabase::new();
        let tenant_id = TenantId::new();
        db.provision_account(Account::new(tenant_id, "152", "Inventory", AccountKind::Asset))
            .await
            .unwrap();
        let err = db
            .provision_account(Account::new(tenant_id, "152", "Again", AccountKind::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
