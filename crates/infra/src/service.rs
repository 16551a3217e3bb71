//! Write-path facade: one unit of work per top-level operation.
//!
//! Each operation opens a scope, runs exactly one engine in it and then
//! commits (success) or rolls back (any error). After a commit the outbox is
//! flushed to the bus; relay failures are logged and never turn a committed
//! operation into an error.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{instrument, warn};

use stockpost_accounting::{FixedUnitCost, JournalEntry, JournalEntryRequest};
use stockpost_core::{TenantId, UserId};
use stockpost_events::{EventBus, NotificationEnvelope};
use stockpost_inventory::MovementRequest;
use stockpost_sales::{Order, OrderRequest};

use crate::auto_posting::AutoPostingBridge;
use crate::batch_resolver::BatchResolver;
use crate::config::StockpostConfig;
use crate::error::ServiceError;
use crate::journal_engine::JournalEngine;
use crate::ledger_store::LedgerStore;
use crate::movement_processor::{MovementOutcome, MovementProcessor};
use crate::order_allocation::OrderAllocator;
use crate::outbox::OutboxRelay;
use crate::uow::{Database, UnitOfWork};

pub type MovementResult = Result<MovementOutcome, ServiceError>;
pub type OrderResult = Result<Order, ServiceError>;
pub type JournalEntryResult = Result<JournalEntry, ServiceError>;

pub struct LedgerService<D, B> {
    db: D,
    movements: MovementProcessor,
    orders: OrderAllocator,
    journal: JournalEngine,
    relay: OutboxRelay<B>,
}

impl<D, B> LedgerService<D, B>
where
    D: Database,
    B: EventBus<NotificationEnvelope<JsonValue>>,
{
    pub fn new(
        db: D,
        movements: MovementProcessor,
        orders: OrderAllocator,
        journal: JournalEngine,
        relay: OutboxRelay<B>,
    ) -> Self {
        Self {
            db,
            movements,
            orders,
            journal,
            relay,
        }
    }

    /// Wire the default engines from configuration.
    pub fn from_config(db: D, bus: B, config: &StockpostConfig) -> Self {
        let ledger = LedgerStore::new();
        let journal = JournalEngine::new();
        let posting = AutoPostingBridge::new(
            Arc::new(FixedUnitCost(config.placeholder_unit_cost)),
            config.accounts.clone(),
            config.missing_account_policy,
            journal,
        );

        Self::new(
            db,
            MovementProcessor::new(BatchResolver::new(), ledger, posting),
            OrderAllocator::new(ledger),
            journal,
            OutboxRelay::new(bus, config.outbox_batch),
        )
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn relay(&self) -> &OutboxRelay<B> {
        &self.relay
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = %user_id))]
    pub async fn create_movement(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        request: &MovementRequest,
    ) -> MovementResult {
        let mut uow = self.db.begin().await?;
        let result = self.movements.execute(&mut uow, tenant_id, user_id, request).await;
        let outcome = finish(uow, result).await?;
        self.publish().await;
        Ok(outcome)
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = %user_id))]
    pub async fn create_order(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        request: &OrderRequest,
    ) -> OrderResult {
        let mut uow = self.db.begin().await?;
        let result = self.orders.allocate(&mut uow, tenant_id, user_id, request).await;
        let order = finish(uow, result).await?;
        self.publish().await;
        Ok(order)
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = %user_id))]
    pub async fn post_journal_entry(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        request: &JournalEntryRequest,
    ) -> JournalEntryResult {
        let mut uow = self.db.begin().await?;
        let result = self.journal.post(&mut uow, tenant_id, user_id, request).await;
        finish(uow, result).await
    }

    /// Relay committed notifications. Returns how many were delivered.
    pub async fn publish(&self) -> usize {
        match self.relay.flush(&self.db).await {
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "outbox relay failed; notifications stay pending");
                0
            }
        }
    }
}

/// Commit on success, roll back on error. The scope is consumed either way.
async fn finish<U, T>(uow: U, result: Result<T, ServiceError>) -> Result<T, ServiceError>
where
    U: UnitOfWork,
{
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(error = %rollback_err, "rollback failed; scope dropped");
            }
            Err(err)
        }
    }
}
