//! Batch Resolver: lookup-or-create of a movement line's batch.

use chrono::Utc;
use tracing::info;

use stockpost_core::{BatchId, TenantId};
use stockpost_inventory::{
    Batch, BatchDecision, MovementItemRequest, MovementType, normalize_batch_code,
};

use crate::error::ServiceError;
use crate::uow::UnitOfWork;

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchResolver;

impl BatchResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the batch a line moves.
    ///
    /// `None` means untracked stock. Unknown codes create a batch only for
    /// INBOUND; every other type fails with `BatchNotFound`.
    pub async fn resolve<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        item: &MovementItemRequest,
        movement_type: MovementType,
    ) -> Result<Option<BatchId>, ServiceError> {
        let Some(code) = normalize_batch_code(item.batch_code.as_deref()) else {
            return Ok(None);
        };

        let existing = uow.find_batch(tenant_id, item.variant_id, code).await?;
        match BatchDecision::decide(Some(code), existing.as_ref(), movement_type)? {
            BatchDecision::Untracked => Ok(None),
            BatchDecision::Existing(id) => Ok(Some(id)),
            BatchDecision::Create => {
                let batch = Batch::received(
                    tenant_id,
                    item.variant_id,
                    code,
                    item.manufactured_on,
                    item.expires_on,
                    Utc::now(),
                )?;
                uow.insert_batch(&batch).await?;
                info!(
                    tenant_id = %tenant_id,
                    variant_id = %item.variant_id,
                    batch_id = %batch.id,
                    code = %batch.code,
                    "batch created on receipt"
                );
                Ok(Some(batch.id))
            }
        }
    }
}
