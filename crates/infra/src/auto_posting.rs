//! Auto-Posting Bridge: movement → balanced journal entry.
//!
//! Value comes from a pluggable [`ValuationStrategy`]; the debit/credit codes
//! come from [`PostingAccounts`]. A posting that cannot be made is reported as
//! [`PostingOutcome::Skipped`] (or fails, under [`MissingAccountPolicy::Fail`]);
//! it is never dropped without a trace.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use stockpost_accounting::{
    JournalEntry, JournalEntryRequest, PostingAccounts, ValuationStrategy,
};
use stockpost_core::{DomainError, UserId};
use stockpost_inventory::Movement;

use crate::error::ServiceError;
use crate::journal_engine::JournalEngine;
use crate::uow::UnitOfWork;

/// What to do when a posting account code is not provisioned for the tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAccountPolicy {
    /// Complete the movement without a journal entry and report the skip.
    #[default]
    Skip,
    /// Abort the movement with `AccountNotProvisioned`.
    Fail,
}

impl FromStr for MissingAccountPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(MissingAccountPolicy::Skip),
            "fail" => Ok(MissingAccountPolicy::Fail),
            other => Err(DomainError::validation(format!(
                "unknown missing-account policy '{other}' (expected skip|fail)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    ZeroValue,
    AccountNotProvisioned { code: String },
}

/// Result of the posting step of a movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingOutcome {
    Posted(JournalEntry),
    Skipped(SkipReason),
    /// The movement type does not post (TRANSFER, ADJUSTMENT).
    NotApplicable,
}

impl PostingOutcome {
    pub fn journal_entry(&self) -> Option<&JournalEntry> {
        match self {
            PostingOutcome::Posted(entry) => Some(entry),
            _ => None,
        }
    }
}

/// A derived posting, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedPosting {
    Entry(JournalEntryRequest),
    Skip(SkipReason),
    NotApplicable,
}

#[derive(Debug, Clone)]
pub struct AutoPostingBridge {
    valuation: Arc<dyn ValuationStrategy>,
    accounts: PostingAccounts,
    policy: MissingAccountPolicy,
    journal: JournalEngine,
}

impl AutoPostingBridge {
    pub fn new(
        valuation: Arc<dyn ValuationStrategy>,
        accounts: PostingAccounts,
        policy: MissingAccountPolicy,
        journal: JournalEngine,
    ) -> Self {
        Self {
            valuation,
            accounts,
            policy,
            journal,
        }
    }

    pub fn policy(&self) -> MissingAccountPolicy {
        self.policy
    }

    /// Build the entry request for `movement` without writing anything.
    ///
    /// Missing accounts are reported as a skip here; the policy is applied by
    /// [`post_movement`](Self::post_movement).
    pub async fn derive_posting<U: UnitOfWork>(
        &self,
        uow: &mut U,
        movement: &Movement,
    ) -> Result<DerivedPosting, ServiceError> {
        let Some(rule) = self.accounts.rule_for(movement.movement_type) else {
            return Ok(DerivedPosting::NotApplicable);
        };

        let value = self.valuation.total_value(movement)?;
        if value.is_zero() {
            return Ok(DerivedPosting::Skip(SkipReason::ZeroValue));
        }

        let tenant_id = movement.tenant_id;
        let Some(debit) = uow.find_account_by_code(tenant_id, &rule.debit_code).await? else {
            return Ok(DerivedPosting::Skip(SkipReason::AccountNotProvisioned {
                code: rule.debit_code,
            }));
        };
        let Some(credit) = uow.find_account_by_code(tenant_id, &rule.credit_code).await? else {
            return Ok(DerivedPosting::Skip(SkipReason::AccountNotProvisioned {
                code: rule.credit_code,
            }));
        };

        Ok(DerivedPosting::Entry(rule.entry(movement, value, &debit, &credit)))
    }

    /// Derive and post the journal entry for a completed movement, in the
    /// movement's unit of work.
    pub async fn post_movement<U: UnitOfWork>(
        &self,
        uow: &mut U,
        user_id: UserId,
        movement: &Movement,
    ) -> Result<PostingOutcome, ServiceError> {
        match self.derive_posting(uow, movement).await? {
            DerivedPosting::NotApplicable => Ok(PostingOutcome::NotApplicable),
            DerivedPosting::Entry(request) => {
                let entry = self
                    .journal
                    .post(uow, movement.tenant_id, user_id, &request)
                    .await?;
                Ok(PostingOutcome::Posted(entry))
            }
            DerivedPosting::Skip(SkipReason::AccountNotProvisioned { code })
                if self.policy == MissingAccountPolicy::Fail =>
            {
                Err(DomainError::AccountNotProvisioned { code }.into())
            }
            DerivedPosting::Skip(reason) => {
                warn!(
                    tenant_id = %movement.tenant_id,
                    movement_code = %movement.code,
                    reason = ?reason,
                    "movement completed without journal entry"
                );
                Ok(PostingOutcome::Skipped(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Skip".parse::<MissingAccountPolicy>().unwrap(), MissingAccountPolicy::Skip);
        assert_eq!("fail".parse::<MissingAccountPolicy>().unwrap(), MissingAccountPolicy::Fail);
        assert!("ignore".parse::<MissingAccountPolicy>().is_err());
        assert_eq!(MissingAccountPolicy::default(), MissingAccountPolicy::Skip);
    }

    #[test]
    fn skip_reason_serializes_with_tag() {
        let json = serde_json::to_value(SkipReason::AccountNotProvisioned { code: "152".into() })
            .unwrap();
        assert_eq!(json["reason"], "account_not_provisioned");
        assert_eq!(json["code"], "152");
    }
}
