//! Outbound notifications emitted after a write commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpost_core::{OrderId, ProductVariantId, TenantId, WarehouseId};

use crate::event::Event;
use crate::tenant::TenantScoped;

/// `stock.updated`: on-hand quantity of a (warehouse, variant) changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub variant_id: ProductVariantId,
    pub occurred_at: DateTime<Utc>,
}

/// `order.created`: a sales order was allocated and recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub order_code: String,
    pub customer_email: Option<String>,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerNotification {
    StockUpdated(StockUpdated),
    OrderCreated(OrderCreated),
}

impl Event for LedgerNotification {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerNotification::StockUpdated(_) => "stock.updated",
            LedgerNotification::OrderCreated(_) => "order.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerNotification::StockUpdated(e) => e.occurred_at,
            LedgerNotification::OrderCreated(e) => e.occurred_at,
        }
    }
}

impl TenantScoped for LedgerNotification {
    fn tenant_id(&self) -> TenantId {
        match self {
            LedgerNotification::StockUpdated(e) => e.tenant_id,
            LedgerNotification::OrderCreated(e) => e.tenant_id,
        }
    }
}
