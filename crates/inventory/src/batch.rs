use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockpost_core::{BatchId, DomainError, DomainResult, ProductVariantId, TenantId};

use crate::movement::MovementType;

/// A lot/traceability unit of a product variant.
///
/// Identity is `(variant_id, code)` within a tenant. Batches are only created
/// as a side effect of an inbound receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub tenant_id: TenantId,
    pub variant_id: ProductVariantId,
    pub code: String,
    pub manufactured_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn received(
        tenant_id: TenantId,
        variant_id: ProductVariantId,
        code: impl Into<String>,
        manufactured_on: Option<NaiveDate>,
        expires_on: Option<NaiveDate>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if let (Some(made), Some(expires)) = (manufactured_on, expires_on) {
            if expires < made {
                return Err(DomainError::validation(
                    "batch expiry date precedes manufacture date",
                ));
            }
        }
        Ok(Self {
            id: BatchId::new(),
            tenant_id,
            variant_id,
            code: code.into(),
            manufactured_on,
            expires_on,
            created_at: at,
        })
    }
}

/// Outcome of resolving a movement line's batch code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    /// No code supplied: the line moves untracked stock.
    Untracked,
    /// The code names an existing batch.
    Existing(BatchId),
    /// Unknown code on an inbound receipt: a batch must be created.
    Create,
}

impl BatchDecision {
    /// Decide how to treat a line's batch code given what the catalog holds.
    ///
    /// Only INBOUND may create a batch; every other movement type consumes or
    /// relocates stock that must have been received under that code.
    pub fn decide(
        code: Option<&str>,
        existing: Option<&Batch>,
        movement_type: MovementType,
    ) -> DomainResult<Self> {
        let Some(code) = code else {
            return Ok(BatchDecision::Untracked);
        };
        match (existing, movement_type) {
            (Some(batch), _) => Ok(BatchDecision::Existing(batch.id)),
            (None, MovementType::Inbound) => Ok(BatchDecision::Create),
            (None, _) => Err(DomainError::batch_not_found(code)),
        }
    }
}

/// Trim a user-supplied batch code; blank codes count as "no batch".
pub fn normalize_batch_code(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(code: &str) -> Batch {
        Batch::received(
            TenantId::new(),
            ProductVariantId::new(),
            code,
            None,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn no_code_is_untracked_for_every_type() {
        for t in [
            MovementType::Inbound,
            MovementType::Outbound,
            MovementType::Transfer,
            MovementType::Adjustment,
        ] {
            assert_eq!(BatchDecision::decide(None, None, t).unwrap(), BatchDecision::Untracked);
        }
    }

    #[test]
    fn existing_batch_is_reused() {
        let b = batch("LOT-1");
        let d = BatchDecision::decide(Some("LOT-1"), Some(&b), MovementType::Outbound).unwrap();
        assert_eq!(d, BatchDecision::Existing(b.id));
    }

    #[test]
    fn unknown_code_is_created_only_on_inbound() {
        assert_eq!(
            BatchDecision::decide(Some("NEW"), None, MovementType::Inbound).unwrap(),
            BatchDecision::Create
        );
        for t in [MovementType::Outbound, MovementType::Transfer, MovementType::Adjustment] {
            let err = BatchDecision::decide(Some("NEW"), None, t).unwrap_err();
            assert_eq!(err, DomainError::batch_not_found("NEW"));
        }
    }

    #[test]
    fn blank_codes_normalize_to_none() {
        assert_eq!(normalize_batch_code(Some("  ")), None);
        assert_eq!(normalize_batch_code(Some(" L7 ")), Some("L7"));
        assert_eq!(normalize_batch_code(None), None);
    }

    #[test]
    fn expiry_before_manufacture_is_rejected() {
        let made = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let expires = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let err = Batch::received(
            TenantId::new(),
            ProductVariantId::new(),
            "L",
            Some(made),
            Some(expires),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
