//! Ledger Store: keyed on-hand quantities.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use stockpost_core::TenantId;
use stockpost_inventory::{StockKey, StockRecord};

use crate::error::ServiceError;
use crate::uow::UnitOfWork;

/// Applies signed deltas to stock records through a unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerStore;

impl LedgerStore {
    pub fn new() -> Self {
        Self
    }

    /// Adjust the record at `key` by `delta`.
    ///
    /// The record is read with a row lock, so the read-compute-write below cannot
    /// interleave with another scope touching the same key. `None` batch is an
    /// exact key component, never a wildcard.
    pub async fn adjust<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        key: StockKey,
        delta: Decimal,
    ) -> Result<StockRecord, ServiceError> {
        let existing = uow.lock_stock(tenant_id, key).await?;
        let updated = StockRecord::adjusted(existing.as_ref(), tenant_id, key, delta, Utc::now())?;
        uow.save_stock(&updated).await?;

        debug!(
            tenant_id = %tenant_id,
            warehouse_id = %key.warehouse_id,
            variant_id = %key.variant_id,
            batch_id = ?key.batch_id,
            %delta,
            quantity = %updated.quantity,
            "stock adjusted"
        );
        Ok(updated)
    }
}
