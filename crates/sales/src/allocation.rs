//! Single-warehouse allocation.
//!
//! A line is satisfied entirely from the one stock record with the highest
//! quantity, or not at all. Lines are never split across warehouses, even
//! when the combined stock would be enough.

use rust_decimal::Decimal;

use stockpost_core::{DomainError, DomainResult, ProductVariantId};
use stockpost_inventory::StockRecord;

/// Pick the stock record that fulfils `requested` units of `variant_id`.
///
/// Ties on quantity go to the lowest key, so the choice is deterministic.
pub fn choose_source<'a>(
    variant_id: ProductVariantId,
    candidates: &'a [StockRecord],
    requested: Decimal,
) -> DomainResult<&'a StockRecord> {
    let best = candidates
        .iter()
        .filter(|r| r.key.variant_id == variant_id && r.quantity > Decimal::ZERO)
        .max_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| b.key.cmp(&a.key)))
        .ok_or(DomainError::OutOfStock { variant_id })?;

    if best.quantity < requested {
        return Err(DomainError::InsufficientStockSingleWarehouse {
            best_available: best.quantity,
            requested,
        });
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockpost_core::{TenantId, WarehouseId};
    use stockpost_inventory::StockKey;

    fn record(variant_id: ProductVariantId, qty: Decimal) -> StockRecord {
        StockRecord {
            tenant_id: TenantId::new(),
            key: StockKey::new(WarehouseId::new(), variant_id, None),
            quantity: qty,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn picks_highest_quantity_warehouse() {
        let v = ProductVariantId::new();
        let records = vec![record(v, dec!(4)), record(v, dec!(20))];
        let chosen = choose_source(v, &records, dec!(10)).unwrap();
        assert_eq!(chosen.key, records[1].key);
    }

    #[test]
    fn never_splits_a_line() {
        let v = ProductVariantId::new();
        let records = vec![record(v, dec!(8)), record(v, dec!(5))];
        let err = choose_source(v, &records, dec!(10)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStockSingleWarehouse {
                best_available: dec!(8),
                requested: dec!(10)
            }
        );
    }

    #[test]
    fn empty_or_zero_stock_is_out_of_stock() {
        let v = ProductVariantId::new();
        assert_eq!(
            choose_source(v, &[], dec!(1)).unwrap_err(),
            DomainError::OutOfStock { variant_id: v }
        );
        let zero = vec![record(v, dec!(0))];
        assert_eq!(
            choose_source(v, &zero, dec!(1)).unwrap_err(),
            DomainError::OutOfStock { variant_id: v }
        );
    }

    #[test]
    fn other_variants_are_ignored() {
        let v = ProductVariantId::new();
        let records = vec![record(ProductVariantId::new(), dec!(100))];
        assert!(matches!(
            choose_source(v, &records, dec!(1)),
            Err(DomainError::OutOfStock { .. })
        ));
    }

    proptest! {
        /// Property: a successful allocation always comes from one record that
        /// alone covers the request, and that record is a maximum.
        #[test]
        fn allocation_is_single_source(
            quantities in prop::collection::vec(0i64..50, 0..6),
            requested in 1i64..60,
        ) {
            let v = ProductVariantId::new();
            let records: Vec<_> = quantities.iter().map(|q| record(v, Decimal::from(*q))).collect();
            let requested = Decimal::from(requested);
            let max = records.iter().map(|r| r.quantity).max().unwrap_or(Decimal::ZERO);

            match choose_source(v, &records, requested) {
                Ok(chosen) => {
                    prop_assert!(chosen.quantity >= requested);
                    prop_assert_eq!(chosen.quantity, max);
                }
                Err(DomainError::OutOfStock { .. }) => prop_assert!(max.is_zero()),
                Err(DomainError::InsufficientStockSingleWarehouse { best_available, .. }) => {
                    prop_assert_eq!(best_available, max);
                    prop_assert!(max < requested);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}
