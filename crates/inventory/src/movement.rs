use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpost_core::amount;
use stockpost_core::{
    BatchId, DomainError, DomainResult, MovementId, ProductVariantId, TenantId, UserId,
    WarehouseId, generate_code,
};

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Inbound,
    Outbound,
    Transfer,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }
}

/// Movement lifecycle status.
///
/// Only `Completed` is reachable today: movements are written straight to
/// their final state. `Draft`/`Pending`/`Cancelled` exist in the schema for a
/// future approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Draft,
    Pending,
    Completed,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Draft => "draft",
            MovementStatus::Pending => "pending",
            MovementStatus::Completed => "completed",
            MovementStatus::Cancelled => "cancelled",
        }
    }
}

/// One requested line of a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementItemRequest {
    pub variant_id: ProductVariantId,
    pub quantity: Decimal,
    #[serde(default)]
    pub batch_code: Option<String>,
    /// Only used when an inbound line creates a new batch.
    #[serde(default)]
    pub manufactured_on: Option<NaiveDate>,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

/// Input of `create_movement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    #[serde(default)]
    pub from_warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub to_warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub reference: Option<String>,
    pub items: Vec<MovementItemRequest>,
}

/// Validated shape of a movement: which warehouses lose and gain stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementRoute {
    Inbound { to: WarehouseId },
    Outbound { from: WarehouseId },
    Transfer { from: WarehouseId, to: WarehouseId },
    AdjustmentIn { to: WarehouseId },
    AdjustmentOut { from: WarehouseId },
}

/// A signed quantity change at one warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerDelta {
    pub warehouse_id: WarehouseId,
    pub delta: Decimal,
}

impl MovementRoute {
    /// Structural check of warehouse fields against the movement type.
    pub fn resolve(
        movement_type: MovementType,
        from: Option<WarehouseId>,
        to: Option<WarehouseId>,
    ) -> DomainResult<Self> {
        match (movement_type, from, to) {
            (MovementType::Inbound, _, Some(to)) => Ok(MovementRoute::Inbound { to }),
            (MovementType::Inbound, _, None) => Err(DomainError::invalid_warehouse(
                "inbound movement requires a destination warehouse",
            )),
            (MovementType::Outbound, Some(from), _) => Ok(MovementRoute::Outbound { from }),
            (MovementType::Outbound, None, _) => Err(DomainError::invalid_warehouse(
                "outbound movement requires a source warehouse",
            )),
            (MovementType::Transfer, Some(from), Some(to)) if from == to => Err(
                DomainError::invalid_warehouse("transfer source and destination must differ"),
            ),
            (MovementType::Transfer, Some(from), Some(to)) => {
                Ok(MovementRoute::Transfer { from, to })
            }
            (MovementType::Transfer, _, _) => Err(DomainError::invalid_warehouse(
                "transfer requires both source and destination warehouses",
            )),
            (MovementType::Adjustment, None, Some(to)) => Ok(MovementRoute::AdjustmentIn { to }),
            (MovementType::Adjustment, Some(from), None) => {
                Ok(MovementRoute::AdjustmentOut { from })
            }
            (MovementType::Adjustment, _, _) => Err(DomainError::invalid_warehouse(
                "adjustment requires exactly one of source or destination warehouse",
            )),
        }
    }

    /// Ledger deltas for one line, source decrement first.
    pub fn deltas(&self, quantity: Decimal) -> Vec<LedgerDelta> {
        let out = |warehouse_id| LedgerDelta {
            warehouse_id,
            delta: -quantity,
        };
        let into = |warehouse_id| LedgerDelta {
            warehouse_id,
            delta: quantity,
        };
        match *self {
            MovementRoute::Inbound { to } | MovementRoute::AdjustmentIn { to } => vec![into(to)],
            MovementRoute::Outbound { from } | MovementRoute::AdjustmentOut { from } => {
                vec![out(from)]
            }
            MovementRoute::Transfer { from, to } => vec![out(from), into(to)],
        }
    }
}

impl MovementRequest {
    /// Validate the request and return its route.
    pub fn validate(&self) -> DomainResult<MovementRoute> {
        let route =
            MovementRoute::resolve(self.movement_type, self.from_warehouse_id, self.to_warehouse_id)?;

        if self.items.is_empty() {
            return Err(DomainError::validation("movement must have at least one item"));
        }
        amount::check_line_count("movement", self.items.len())?;
        for (idx, item) in self.items.iter().enumerate() {
            if item.quantity <= Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "item {idx}: quantity must be positive"
                )));
            }
            amount::check_quantity(&format!("item {idx}"), item.quantity)?;
        }

        Ok(route)
    }
}

/// A persisted movement line (batch already resolved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementItem {
    pub variant_id: ProductVariantId,
    pub quantity: Decimal,
    pub batch_id: Option<BatchId>,
}

/// Movement header + items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub code: String,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub from_warehouse_id: Option<WarehouseId>,
    pub to_warehouse_id: Option<WarehouseId>,
    pub reference: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<MovementItem>,
}

impl Movement {
    /// Build a movement in its final `Completed` state.
    pub fn completed(
        tenant_id: TenantId,
        created_by: UserId,
        request: &MovementRequest,
        items: Vec<MovementItem>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            tenant_id,
            code: generate_code("MV", at),
            movement_type: request.movement_type,
            status: MovementStatus::Completed,
            from_warehouse_id: request.from_warehouse_id,
            to_warehouse_id: request.to_warehouse_id,
            reference: request.reference.clone(),
            created_by,
            created_at: at,
            items,
        }
    }

    pub fn total_quantity(&self) -> Decimal {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(
        movement_type: MovementType,
        from: Option<WarehouseId>,
        to: Option<WarehouseId>,
    ) -> MovementRequest {
        MovementRequest {
            movement_type,
            from_warehouse_id: from,
            to_warehouse_id: to,
            reference: None,
            items: vec![MovementItemRequest {
                variant_id: ProductVariantId::new(),
                quantity: dec!(5),
                batch_code: None,
                manufactured_on: None,
                expires_on: None,
            }],
        }
    }

    #[test]
    fn warehouse_requirements_per_type() {
        let w1 = WarehouseId::new();
        let w2 = WarehouseId::new();

        assert!(request(MovementType::Inbound, None, Some(w1)).validate().is_ok());
        assert!(request(MovementType::Outbound, Some(w1), None).validate().is_ok());
        assert!(request(MovementType::Transfer, Some(w1), Some(w2)).validate().is_ok());

        for bad in [
            request(MovementType::Inbound, Some(w1), None),
            request(MovementType::Outbound, None, Some(w1)),
            request(MovementType::Transfer, Some(w1), None),
            request(MovementType::Transfer, None, Some(w2)),
            request(MovementType::Transfer, Some(w1), Some(w1)),
            request(MovementType::Adjustment, None, None),
            request(MovementType::Adjustment, Some(w1), Some(w2)),
        ] {
            let err = bad.validate().unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidWarehouseForMovementType(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn transfer_decrements_source_before_destination() {
        let from = WarehouseId::new();
        let to = WarehouseId::new();
        let deltas = MovementRoute::Transfer { from, to }.deltas(dec!(20));
        assert_eq!(
            deltas,
            vec![
                LedgerDelta { warehouse_id: from, delta: dec!(-20) },
                LedgerDelta { warehouse_id: to, delta: dec!(20) },
            ]
        );
    }

    #[test]
    fn adjustment_direction_follows_warehouse_side() {
        let w = WarehouseId::new();
        let route = request(MovementType::Adjustment, Some(w), None).validate().unwrap();
        assert_eq!(route.deltas(dec!(3))[0].delta, dec!(-3));
        let route = request(MovementType::Adjustment, None, Some(w)).validate().unwrap();
        assert_eq!(route.deltas(dec!(3))[0].delta, dec!(3));
    }

    #[test]
    fn empty_or_non_positive_items_are_rejected() {
        let w = WarehouseId::new();
        let mut req = request(MovementType::Inbound, None, Some(w));
        req.items[0].quantity = dec!(0);
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));

        req.items.clear();
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn quantities_must_fit_the_ledger_columns() {
        let w = WarehouseId::new();
        let mut req = request(MovementType::Inbound, None, Some(w));

        req.items[0].quantity = dec!(0.000001);
        assert!(req.validate().is_ok());

        req.items[0].quantity = dec!(0.0000001);
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));

        req.items[0].quantity = Decimal::MAX;
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn completed_movement_keeps_request_fields() {
        let w = WarehouseId::new();
        let req = request(MovementType::Inbound, None, Some(w));
        let items = vec![MovementItem {
            variant_id: req.items[0].variant_id,
            quantity: dec!(5),
            batch_id: None,
        }];
        let mv = Movement::completed(TenantId::new(), UserId::new(), &req, items, Utc::now());
        assert_eq!(mv.status, MovementStatus::Completed);
        assert_eq!(mv.to_warehouse_id, Some(w));
        assert!(mv.code.starts_with("MV-"));
        assert_eq!(mv.total_quantity(), dec!(5));
    }
}
