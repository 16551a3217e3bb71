//! Movement valuation.
//!
//! Posting logic only asks a [`ValuationStrategy`] for a value; swapping in a
//! FIFO or weighted-average implementation does not touch the posting rules.

use rust_decimal::Decimal;

use stockpost_core::amount::{self, MAX_AMOUNT};
use stockpost_core::{DomainResult, TenantId};
use stockpost_inventory::{Movement, MovementItem};

/// Strategy for costing movement lines.
pub trait ValuationStrategy: Send + Sync + core::fmt::Debug {
    /// Cost of one unit of `item` for the given tenant.
    fn unit_cost(&self, tenant_id: TenantId, item: &MovementItem) -> Decimal;

    /// `Σ(quantity × unit_cost)` over the movement's lines, rounded to cents.
    ///
    /// A value that does not fit a money column is a `Validation` error.
    fn total_value(&self, movement: &Movement) -> DomainResult<Decimal> {
        let mut total = Decimal::ZERO;
        for item in &movement.items {
            let line = item
                .quantity
                .checked_mul(self.unit_cost(movement.tenant_id, item))
                .ok_or_else(amount::out_of_range)?;
            total = total.checked_add(line).ok_or_else(amount::out_of_range)?;
        }
        let total = total.round_dp(2);
        if total.abs() > MAX_AMOUNT {
            return Err(amount::out_of_range());
        }
        Ok(total)
    }
}

/// Placeholder costing: every unit of every variant costs the same.
///
/// This is a stand-in until a real costing method exists; it is not FIFO or
/// weighted average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUnitCost(pub Decimal);

impl ValuationStrategy for FixedUnitCost {
    fn unit_cost(&self, _tenant_id: TenantId, _item: &MovementItem) -> Decimal {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use stockpost_core::{ProductVariantId, UserId, WarehouseId};
    use stockpost_inventory::{MovementItemRequest, MovementRequest, MovementType};

    fn movement(quantities: &[Decimal]) -> Movement {
        let request = MovementRequest {
            movement_type: MovementType::Inbound,
            from_warehouse_id: None,
            to_warehouse_id: Some(WarehouseId::new()),
            reference: None,
            items: quantities
                .iter()
                .map(|q| MovementItemRequest {
                    variant_id: ProductVariantId::new(),
                    quantity: *q,
                    batch_code: None,
                    manufactured_on: None,
                    expires_on: None,
                })
                .collect(),
        };
        let items = request
            .items
            .iter()
            .map(|i| MovementItem { variant_id: i.variant_id, quantity: i.quantity, batch_id: None })
            .collect();
        Movement::completed(TenantId::new(), UserId::new(), &request, items, Utc::now())
    }

    #[test]
    fn fixed_cost_multiplies_every_line() {
        let mv = movement(&[dec!(100), dec!(2.5)]);
        assert_eq!(FixedUnitCost(dec!(10000)).total_value(&mv), Ok(dec!(1025000)));
    }

    #[test]
    fn zero_cost_values_to_zero() {
        let mv = movement(&[dec!(100)]);
        assert!(FixedUnitCost(Decimal::ZERO).total_value(&mv).unwrap().is_zero());
    }

    #[derive(Debug)]
    struct PerVariant(ProductVariantId);

    impl ValuationStrategy for PerVariant {
        fn unit_cost(&self, _tenant_id: TenantId, item: &MovementItem) -> Decimal {
            if item.variant_id == self.0 { dec!(3.333) } else { dec!(1) }
        }
    }

    #[test]
    fn custom_strategy_plugs_in() {
        let mv = movement(&[dec!(3), dec!(4)]);
        let strategy = PerVariant(mv.items[0].variant_id);
        assert_eq!(strategy.total_value(&mv), Ok(dec!(14.00)));
    }

    #[test]
    fn value_beyond_money_range_is_an_error() {
        let mv = movement(&[Decimal::MAX]);
        assert_eq!(FixedUnitCost(dec!(10000)).total_value(&mv), Err(amount::out_of_range()));

        let mv = movement(&[dec!(99999999999999), dec!(99999999999999)]);
        assert_eq!(FixedUnitCost(dec!(10000)).total_value(&mv), Err(amount::out_of_range()));
    }
}
