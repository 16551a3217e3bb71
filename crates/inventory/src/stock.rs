use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpost_core::amount::{self, MAX_QUANTITY};
use stockpost_core::{BatchId, DomainError, DomainResult, ProductVariantId, TenantId, WarehouseId};

/// Identity of a ledger row (tenant scoping is carried alongside).
///
/// `batch_id: None` is a distinct key ("untracked stock"), not a wildcard
/// over all batches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub warehouse_id: WarehouseId,
    pub variant_id: ProductVariantId,
    pub batch_id: Option<BatchId>,
}

impl StockKey {
    pub fn new(
        warehouse_id: WarehouseId,
        variant_id: ProductVariantId,
        batch_id: Option<BatchId>,
    ) -> Self {
        Self {
            warehouse_id,
            variant_id,
            batch_id,
        }
    }
}

/// On-hand quantity for one (warehouse, variant, batch) key.
///
/// Records are never deleted; zero is a valid resting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub tenant_id: TenantId,
    pub key: StockKey,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Apply `delta` to an optional existing record.
    ///
    /// - absent + negative delta → `InsufficientStock`
    /// - absent + non-negative delta → new record with `quantity = delta`
    /// - present → `old + delta`, rejected if it would go below zero
    /// - a result above [`MAX_QUANTITY`] → `Validation`
    ///
    /// The input record is never modified; on error the caller keeps the old state.
    pub fn adjusted(
        existing: Option<&StockRecord>,
        tenant_id: TenantId,
        key: StockKey,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> DomainResult<StockRecord> {
        match existing {
            None if delta < Decimal::ZERO => {
                Err(DomainError::InsufficientStock {
                    available: Decimal::ZERO,
                    requested: -delta,
                })
            }
            None => {
                if delta > MAX_QUANTITY {
                    return Err(DomainError::validation("stock quantity out of range"));
                }
                Ok(StockRecord {
                    tenant_id,
                    key,
                    quantity: delta,
                    updated_at: at,
                })
            }
            Some(record) => {
                if record.tenant_id != tenant_id {
                    return Err(DomainError::tenant_isolation(
                        "stock record belongs to another tenant",
                    ));
                }
                if record.key != key {
                    return Err(DomainError::validation("stock record key mismatch"));
                }
                record.with_delta(delta, at)
            }
        }
    }

    fn with_delta(&self, delta: Decimal, at: DateTime<Utc>) -> DomainResult<StockRecord> {
        let quantity = self.quantity.checked_add(delta).ok_or_else(amount::out_of_range)?;
        if quantity > MAX_QUANTITY {
            return Err(DomainError::validation("stock quantity out of range"));
        }
        if quantity < Decimal::ZERO {
            return Err(DomainError::InsufficientStock {
                available: self.quantity,
                requested: -delta,
            });
        }
        Ok(StockRecord {
            quantity,
            updated_at: at,
            ..self.clone()
        })
    }
}
