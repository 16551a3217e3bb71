//! Journal Engine: validates and persists balanced entries.

use chrono::Utc;
use tracing::{info, instrument};

use stockpost_accounting::{JournalEntry, JournalEntryRequest};
use stockpost_core::{DomainError, TenantId, UserId};

use crate::error::ServiceError;
use crate::uow::UnitOfWork;

#[derive(Debug, Clone, Copy, Default)]
pub struct JournalEngine;

impl JournalEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate `request` and write it as a `Posted` entry.
    ///
    /// Balance is checked before account existence, so an unbalanced entry
    /// never costs a lookup. Nothing is written on failure.
    #[instrument(
        skip(self, uow, request),
        fields(tenant_id = %tenant_id, user_id = %user_id, lines = request.lines.len()),
        err
    )]
    pub async fn post<U: UnitOfWork>(
        &self,
        uow: &mut U,
        tenant_id: TenantId,
        user_id: UserId,
        request: &JournalEntryRequest,
    ) -> Result<JournalEntry, ServiceError> {
        let entry = JournalEntry::posted(tenant_id, user_id, request, Utc::now())?;

        for line in &entry.lines {
            if uow.find_account(tenant_id, line.account_id).await?.is_none() {
                return Err(DomainError::not_found(format!("account {}", line.account_id)).into());
            }
        }

        uow.insert_journal_entry(&entry).await?;

        let totals = entry.totals();
        info!(
            journal_entry_id = %entry.id,
            reference = ?entry.reference,
            debit = %totals.debit,
            credit = %totals.credit,
            "journal entry posted"
        );
        Ok(entry)
    }
}
