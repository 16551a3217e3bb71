//! Transactional outbox for post-commit notifications.
//!
//! Engines stage [`OutboxMessage`]s inside the unit of work, so a notification
//! exists if and only if the write that caused it committed. [`OutboxRelay`]
//! then publishes pending messages to the bus and marks them delivered. A crash
//! between commit and publish leaves them pending for the next flush
//! (at-least-once; consumers deduplicate on `event_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use stockpost_core::{ProductVariantId, TenantId, WarehouseId};
use stockpost_events::{
    EventBus, LedgerNotification, NotificationEnvelope, StockUpdated, TenantScoped,
};

use crate::error::StoreError;
use crate::uow::{Database, UnitOfWork};

/// A staged notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    pub fn from_notification(notification: &LedgerNotification) -> Result<Self, StoreError> {
        let id = Uuid::now_v7();
        let envelope = NotificationEnvelope::from_typed(id, notification.tenant_id(), notification)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        Ok(Self {
            id,
            tenant_id: envelope.tenant_id(),
            event_type: envelope.event_type().to_string(),
            event_version: envelope.event_version(),
            occurred_at: envelope.occurred_at(),
            payload: envelope.into_payload(),
            delivered_at: None,
        })
    }

    /// Convert the row into the envelope published on the bus.
    pub fn to_envelope(&self) -> NotificationEnvelope<JsonValue> {
        NotificationEnvelope::new(
            self.id,
            self.tenant_id,
            self.event_type.clone(),
            self.event_version,
            self.occurred_at,
            self.payload.clone(),
        )
    }
}

/// Distinct (warehouse, variant) pairs touched by one operation, in first-touch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockTouches {
    touched: Vec<(WarehouseId, ProductVariantId)>,
}

impl StockTouches {
    pub fn record(&mut self, warehouse_id: WarehouseId, variant_id: ProductVariantId) {
        if !self.touched.contains(&(warehouse_id, variant_id)) {
            self.touched.push((warehouse_id, variant_id));
        }
    }

    pub fn pairs(&self) -> &[(WarehouseId, ProductVariantId)] {
        &self.touched
    }

    /// Stage one `stock.updated` per touched pair.
    pub async fn enqueue<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        for &(warehouse_id, variant_id) in &self.touched {
            let note = LedgerNotification::StockUpdated(StockUpdated {
                tenant_id,
                warehouse_id,
                variant_id,
                occurred_at: at,
            });
            uow.enqueue(&OutboxMessage::from_notification(&note)?).await?;
        }
        Ok(())
    }
}

/// Publishes committed outbox messages to a bus.
#[derive(Debug)]
pub struct OutboxRelay<B> {
    bus: B,
    batch_size: usize,
}

impl<B> OutboxRelay<B>
where
    B: EventBus<NotificationEnvelope<JsonValue>>,
{
    pub fn new(bus: B, batch_size: usize) -> Self {
        Self {
            bus,
            batch_size: batch_size.max(1),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Publish everything pending. Returns the number of messages delivered.
    ///
    /// Stops at the first publish failure; the failed message and everything
    /// after it stay pending.
    pub async fn flush<D: Database>(&self, db: &D) -> Result<usize, StoreError> {
        let mut total = 0;

        loop {
            let pending = db.pending_outbox(self.batch_size).await?;
            if pending.is_empty() {
                break;
            }

            let mut delivered = Vec::with_capacity(pending.len());
            let mut failed = false;
            for message in &pending {
                match self.bus.publish(message.to_envelope()) {
                    Ok(()) => delivered.push(message.id),
                    Err(err) => {
                        warn!(
                            message_id = %message.id,
                            event_type = %message.event_type,
                            error = ?err,
                            "notification publish failed; leaving it pending"
                        );
                        failed = true;
                        break;
                    }
                }
            }

            db.mark_delivered(&delivered).await?;
            total += delivered.len();

            if failed || pending.len() < self.batch_size {
                break;
            }
        }

        debug!(delivered = total, "outbox flushed");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_are_deduplicated_in_order() {
        let w1 = WarehouseId::new();
        let w2 = WarehouseId::new();
        let v = ProductVariantId::new();

        let mut touches = StockTouches::default();
        touches.record(w1, v);
        touches.record(w2, v);
        touches.record(w1, v);

        assert_eq!(touches.pairs(), &[(w1, v), (w2, v)]);
    }

    #[test]
    fn message_round_trips_to_envelope() {
        let tenant_id = TenantId::new();
        let note = LedgerNotification::StockUpdated(StockUpdated {
            tenant_id,
            warehouse_id: WarehouseId::new(),
            variant_id: ProductVariantId::new(),
            occurred_at: Utc::now(),
        });

        let msg = OutboxMessage::from_notification(&note).unwrap();
        assert_eq!(msg.event_type, "stock.updated");
        assert!(msg.delivered_at.is_none());

        let env = msg.to_envelope();
        assert_eq!(env.event_id(), msg.id);
        assert_eq!(env.tenant_id(), tenant_id);
        let back: LedgerNotification = serde_json::from_value(env.into_payload()).unwrap();
        assert_eq!(back, note);
    }
}
