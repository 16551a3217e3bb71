use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpost_core::amount::{self, MAX_AMOUNT};
use stockpost_core::{
    BatchId, DomainError, DomainResult, OrderId, ProductVariantId, TenantId, UserId, WarehouseId,
    generate_code,
};

/// Sales order status lifecycle.
///
/// Orders are recorded only once stock has been allocated, so they start as
/// `Confirmed`; invoicing and closing happen outside this write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Invoiced,
    Closed,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Draft => "draft",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::Invoiced => "invoiced",
            SalesOrderStatus::Closed => "closed",
        }
    }
}

/// Requested order line. `unit_price` comes from the caller's price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub variant_id: ProductVariantId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input of `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub customer_email: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

impl OrderRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order must have at least one item"));
        }
        amount::check_line_count("order", self.items.len())?;
        for (idx, line) in self.items.iter().enumerate() {
            if line.quantity <= Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "item {idx}: quantity must be positive"
                )));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "item {idx}: unit price must not be negative"
                )));
            }
            let what = format!("item {idx}");
            amount::check_quantity(&what, line.quantity)?;
            amount::check_amount(&what, line.unit_price)?;
        }
        Ok(())
    }
}

/// Allocated order line: where the stock came from and what it costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub variant_id: ProductVariantId,
    pub warehouse_id: WarehouseId,
    pub batch_id: Option<BatchId>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> DomainResult<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(amount::out_of_range)
    }
}

/// Recorded sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub code: String,
    pub status: SalesOrderStatus,
    pub customer_email: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
    pub total_amount: Decimal,
}

impl Order {
    pub fn confirmed(
        tenant_id: TenantId,
        created_by: UserId,
        customer_email: Option<String>,
        lines: Vec<OrderLine>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let line_totals = lines
            .iter()
            .map(OrderLine::line_total)
            .collect::<DomainResult<Vec<_>>>()?;
        let total_amount = amount::checked_sum(line_totals)?.round_dp(2);
        if total_amount > MAX_AMOUNT {
            return Err(amount::out_of_range());
        }
        Ok(Self {
            id: OrderId::new(),
            tenant_id,
            code: generate_code("SO", at),
            status: SalesOrderStatus::Confirmed,
            customer_email,
            created_by,
            created_at: at,
            lines,
            total_amount,
        })
    }

    /// Distinct warehouses that supplied this order, in line order.
    pub fn warehouses(&self) -> Vec<WarehouseId> {
        let mut seen = Vec::new();
        for line in &self.lines {
            if !seen.contains(&line.warehouse_id) {
                seen.push(line.warehouse_id);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(no: u32, warehouse_id: WarehouseId, qty: Decimal, price: Decimal) -> OrderLine {
        OrderLine {
            line_no: no,
            variant_id: ProductVariantId::new(),
            warehouse_id,
            batch_id: None,
            quantity: qty,
            unit_price: price,
        }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let w = WarehouseId::new();
        let order = Order::confirmed(
            TenantId::new(),
            UserId::new(),
            None,
            vec![line(1, w, dec!(10), dec!(19.99)), line(2, w, dec!(3), dec!(5))],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_amount, dec!(214.90));
        assert_eq!(order.status, SalesOrderStatus::Confirmed);
        assert!(order.code.starts_with("SO-"));
        assert_eq!(order.warehouses(), vec![w]);
    }

    #[test]
    fn request_validation() {
        let ok = OrderRequest {
            customer_email: None,
            items: vec![OrderLineRequest {
                variant_id: ProductVariantId::new(),
                quantity: dec!(1),
                unit_price: dec!(0),
            }],
        };
        assert!(ok.validate().is_ok());

        let mut bad = ok.clone();
        bad.items[0].quantity = dec!(-1);
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));

        let mut bad = ok.clone();
        bad.items[0].unit_price = dec!(-0.01);
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));

        let empty = OrderRequest { customer_email: None, items: vec![] };
        assert!(matches!(empty.validate(), Err(DomainError::Validation(_))));

        let mut bad = ok.clone();
        bad.items[0].unit_price = dec!(19.999);
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));

        let mut bad = ok.clone();
        bad.items[0].quantity = dec!(0.0000001);
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));

        let mut bad = ok;
        bad.items[0].quantity = Decimal::MAX;
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn total_beyond_money_range_is_an_error() {
        let w = WarehouseId::new();
        let err = Order::confirmed(
            TenantId::new(),
            UserId::new(),
            None,
            vec![line(1, w, Decimal::MAX, dec!(2))],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, amount::out_of_range());

        let err = Order::confirmed(
            TenantId::new(),
            UserId::new(),
            None,
            vec![line(1, w, dec!(99999999999999), MAX_AMOUNT)],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, amount::out_of_range());
    }
}
