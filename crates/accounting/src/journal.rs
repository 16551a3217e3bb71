use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpost_core::amount;
use stockpost_core::{AccountId, DomainError, DomainResult, JournalEntryId, TenantId, UserId};

/// Maximum |Σdebit − Σcredit| accepted as rounding noise.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Journal entry status.
///
/// The posting path only ever writes `Posted`; `Draft`/`Void` are kept for
/// manual bookkeeping workflows outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalEntryStatus {
    Draft,
    Posted,
    Void,
}

impl JournalEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalEntryStatus::Draft => "draft",
            JournalEntryStatus::Posted => "posted",
            JournalEntryStatus::Void => "void",
        }
    }
}

/// One requested line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineRequest {
    pub account_id: AccountId,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl JournalLineRequest {
    pub fn debit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: Some(description.into()),
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: Some(description.into()),
        }
    }
}

/// Input of `post_journal_entry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub lines: Vec<JournalLineRequest>,
}

/// Side totals of a validated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalTotals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl JournalEntryRequest {
    /// Check line shape and the double-entry invariant.
    ///
    /// - every amount is non-negative, in whole cents, and a line carries at most one side
    /// - `|Σdebit − Σcredit| <= 0.01`, else `UnbalancedEntry`
    /// - at least one side is non-zero, else `EmptyEntry`
    pub fn validate(&self) -> DomainResult<JournalTotals> {
        amount::check_line_count("journal entry", self.lines.len())?;

        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;

        for (idx, line) in self.lines.iter().enumerate() {
            if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {idx}: amounts must not be negative"
                )));
            }
            if line.debit > Decimal::ZERO && line.credit > Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {idx}: a line cannot carry both debit and credit"
                )));
            }
            let what = format!("line {idx}");
            amount::check_amount(&what, line.debit)?;
            amount::check_amount(&what, line.credit)?;
            debit = debit.checked_add(line.debit).ok_or_else(amount::out_of_range)?;
            credit = credit.checked_add(line.credit).ok_or_else(amount::out_of_range)?;
        }

        if (debit - credit).abs() > BALANCE_TOLERANCE {
            return Err(DomainError::UnbalancedEntry { debit, credit });
        }
        if debit.is_zero() && credit.is_zero() {
            return Err(DomainError::EmptyEntry);
        }

        Ok(JournalTotals { debit, credit })
    }
}

/// One side of a posted journal entry (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
}

/// A posted double-entry journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub tenant_id: TenantId,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub status: JournalEntryStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalEntryLine>,
}

impl JournalEntry {
    /// Validate `request` and build the entry in `Posted` state.
    pub fn posted(
        tenant_id: TenantId,
        created_by: UserId,
        request: &JournalEntryRequest,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        request.validate()?;

        Ok(Self {
            id: JournalEntryId::new(),
            tenant_id,
            date: request.date,
            reference: request.reference.clone(),
            description: request.description.clone(),
            status: JournalEntryStatus::Posted,
            created_by,
            created_at: at,
            lines: request
                .lines
                .iter()
                .map(|l| JournalEntryLine {
                    account_id: l.account_id,
                    debit: l.debit,
                    credit: l.credit,
                    description: l.description.clone(),
                })
                .collect(),
        })
    }

    pub fn totals(&self) -> JournalTotals {
        JournalTotals {
            debit: self.lines.iter().map(|l| l.debit).sum(),
            credit: self.lines.iter().map(|l| l.credit).sum(),
        }
    }
}
