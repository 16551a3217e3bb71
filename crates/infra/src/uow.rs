//! Explicit unit of work.
//!
//! Every engine call receives the transaction scope it must write through.
//! A top-level operation opens one scope with [`Database::begin`] and ends it
//! exactly once with `commit` or `rollback`; both consume the scope. A scope
//! dropped without `commit` (error, timeout, cancelled future) rolls back.

use async_trait::async_trait;
use uuid::Uuid;

use stockpost_accounting::{Account, JournalEntry};
use stockpost_core::{AccountId, ProductVariantId, TenantId};
use stockpost_inventory::{Batch, Movement, StockKey, StockRecord};
use stockpost_sales::Order;

use crate::error::StoreError;
use crate::outbox::OutboxMessage;

/// One transaction scope over the stock, catalog, journal and outbox tables.
///
/// All reads that precede a write of the same row lock that row until the
/// scope ends, so concurrent operations on one stock key serialize.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read a stock record for update. Returns `None` when the key has never been stocked.
    async fn lock_stock(
        &mut self,
        tenant_id: TenantId,
        key: StockKey,
    ) -> Result<Option<StockRecord>, StoreError>;

    /// Insert or overwrite a stock record previously read with `lock_stock`.
    async fn save_stock(&mut self, record: &StockRecord) -> Result<(), StoreError>;

    /// Read and lock every stock record of a variant, highest quantity first.
    async fn lock_variant_stock(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
    ) -> Result<Vec<StockRecord>, StoreError>;

    async fn find_batch(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
        code: &str,
    ) -> Result<Option<Batch>, StoreError>;

    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), StoreError>;

    /// Persist a movement header together with its items.
    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), StoreError>;

    async fn find_account(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_code(
        &mut self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Persist a journal entry together with its lines.
    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError>;

    /// Persist an order together with its lines.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Stage a notification; it becomes visible to the relay only on commit.
    async fn enqueue(&mut self, message: &OutboxMessage) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Factory for units of work plus the outbox side used by the relay.
#[async_trait]
pub trait Database: Send + Sync {
    type Uow: UnitOfWork + 'static;

    async fn begin(&self) -> Result<Self::Uow, StoreError>;

    /// Oldest undelivered outbox messages, at most `limit`.
    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), StoreError>;
}
