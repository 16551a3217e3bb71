//! Movement Processor: validate, apply and post one stock movement.
//!
//! All steps run inside the caller's unit of work:
//!
//! 1. structural validation (warehouses vs type, items, quantities)
//! 2. batch resolution per line
//! 3. movement header + items written as `Completed`
//! 4. ledger adjustments per line, source decrement before destination increment
//! 5. auto-posting for INBOUND/OUTBOUND
//! 6. one `stock.updated` staged per touched (warehouse, variant)
//!
//! Any error leaves the scope to be rolled back by the caller.

use chrono::Utc;
use tracing::{info, instrument};

use stockpost_core::{TenantId, UserId};
use stockpost_inventory::{Movement, MovementItem, MovementRequest, StockKey};

use crate::auto_posting::{AutoPostingBridge, PostingOutcome};
use crate::batch_resolver::BatchResolver;
use crate::error::ServiceError;
use crate::ledger_store::LedgerStore;
use crate::outbox::StockTouches;
use crate::uow::UnitOfWork;

/// A completed movement and what happened at the posting step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementOutcome {
    pub movement: Movement,
    pub posting: PostingOutcome,
}

#[derive(Debug, Clone)]
pub struct MovementProcessor {
    batches: BatchResolver,
    ledger: LedgerStore,
    posting: AutoPostingBridge,
}

impl MovementProcessor {
    pub fn new(batches: BatchResolver, ledger: LedgerStore, posting: AutoPostingBridge) -> Self {
        Self {
            batches,
            ledger,
            posting,
        }
    }

    #[instrument(
        skip(self, uow, request),
        fields(
            tenant_id = %tenant_id,
            user_id = %user_id,
            movement_type = request.movement_type.as_str(),
            items = request.items.len()
        ),
        err
    )]
    pub async fn execute<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        user_id: UserId,
        request: &MovementRequest,
    ) -> Result<MovementOutcome, ServiceError> {
        let route = request.validate()?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let batch_id = self
                .batches
                .resolve(uow, tenant_id, line, request.movement_type)
                .await?;
            items.push(MovementItem {
                variant_id: line.variant_id,
                quantity: line.quantity,
                batch_id,
            });
        }

        let movement = Movement::completed(tenant_id, user_id, request, items, Utc::now());
        uow.insert_movement(&movement).await?;

        let mut touches = StockTouches::default();
        for item in &movement.items {
            for step in route.deltas(item.quantity) {
                let key = StockKey::new(step.warehouse_id, item.variant_id, item.batch_id);
                self.ledger.adjust(uow, tenant_id, key, step.delta).await?;
                touches.record(step.warehouse_id, item.variant_id);
            }
        }

        let posting = self.posting.post_movement(uow, user_id, &movement).await?;

        touches.enqueue(uow, tenant_id, movement.created_at).await?;

        info!(
            movement_id = %movement.id,
            movement_code = %movement.code,
            total_quantity = %movement.total_quantity(),
            journal_entry_id = ?posting.journal_entry().map(|e| e.id),
            "movement completed"
        );
        Ok(MovementOutcome { movement, posting })
    }
}
