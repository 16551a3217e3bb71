//! Order Allocation: fulfil each order line from one warehouse.

use chrono::Utc;
use tracing::{info, instrument};

use stockpost_core::{DomainError, TenantId, UserId};
use stockpost_events::{LedgerNotification, OrderCreated};
use stockpost_sales::{Order, OrderLine, OrderRequest, choose_source};

use crate::error::ServiceError;
use crate::ledger_store::LedgerStore;
use crate::outbox::{OutboxMessage, StockTouches};
use crate::uow::UnitOfWork;

#[derive(Debug, Clone, Default)]
pub struct OrderAllocator {
    ledger: LedgerStore,
}

impl OrderAllocator {
    pub fn new(ledger: LedgerStore) -> Self {
        Self { ledger }
    }

    /// Allocate every line, deduct the stock and record the order.
    ///
    /// Candidates are re-read per line, so a second line for the same variant
    /// sees the deduction made by the first. A line is never split across
    /// warehouses.
    #[instrument(
        skip(self, uow, request),
        fields(tenant_id = %tenant_id, user_id = %user_id, lines = request.items.len()),
        err
    )]
    pub async fn allocate<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        user_id: UserId,
        request: &OrderRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;

        let mut lines = Vec::with_capacity(request.items.len());
        let mut touches = StockTouches::default();

        for (idx, item) in request.items.iter().enumerate() {
            let candidates = uow.lock_variant_stock(tenant_id, item.variant_id).await?;
            let source = choose_source(item.variant_id, &candidates, item.quantity)?;
            let key = source.key;

            self.ledger.adjust(uow, tenant_id, key, -item.quantity).await?;
            touches.record(key.warehouse_id, key.variant_id);

            lines.push(OrderLine {
                line_no: u32::try_from(idx + 1)
                    .map_err(|_| DomainError::validation("order line number out of range"))?,
                variant_id: item.variant_id,
                warehouse_id: key.warehouse_id,
                batch_id: key.batch_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let order = Order::confirmed(
            tenant_id,
            user_id,
            request.customer_email.clone(),
            lines,
            Utc::now(),
        )?;
        uow.insert_order(&order).await?;

        touches.enqueue(uow, tenant_id, order.created_at).await?;
        let created = LedgerNotification::OrderCreated(OrderCreated {
            tenant_id,
            order_id: order.id,
            order_code: order.code.clone(),
            customer_email: order.customer_email.clone(),
            total_amount: order.total_amount,
            occurred_at: order.created_at,
        });
        uow.enqueue(&OutboxMessage::from_notification(&created)?).await?;

        info!(
            order_id = %order.id,
            order_code = %order.code,
            total_amount = %order.total_amount,
            warehouses = order.warehouses().len(),
            "order allocated"
        );
        Ok(order)
    }
}
