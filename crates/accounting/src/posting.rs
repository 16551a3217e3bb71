//! Posting rules: which accounts a completed movement debits and credits.

use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use stockpost_inventory::{Movement, MovementType};

use crate::account::Account;
use crate::journal::{JournalEntryRequest, JournalLineRequest};

/// Chart-of-accounts codes used by automatic posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAccounts {
    pub inventory: String,
    pub payable: String,
    pub cogs: String,
}

impl Default for PostingAccounts {
    fn default() -> Self {
        Self {
            inventory: "152".to_string(),
            payable: "331".to_string(),
            cogs: "632".to_string(),
        }
    }
}

/// Debit/credit account codes for one movement type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRule {
    pub debit_code: String,
    pub credit_code: String,
}

impl PostingAccounts {
    /// INBOUND: Inventory / Payable. OUTBOUND: COGS / Inventory. Others post nothing.
    pub fn rule_for(&self, movement_type: MovementType) -> Option<PostingRule> {
        match movement_type {
            MovementType::Inbound => Some(PostingRule {
                debit_code: self.inventory.clone(),
                credit_code: self.payable.clone(),
            }),
            MovementType::Outbound => Some(PostingRule {
                debit_code: self.cogs.clone(),
                credit_code: self.inventory.clone(),
            }),
            MovementType::Transfer | MovementType::Adjustment => None,
        }
    }
}

impl PostingRule {
    /// Two-line entry moving `value` from `credit` to `debit`, dated on the movement.
    pub fn entry(
        &self,
        movement: &Movement,
        value: Decimal,
        debit: &Account,
        credit: &Account,
    ) -> JournalEntryRequest {
        let label = match movement.movement_type {
            MovementType::Inbound => "Stock receipt",
            MovementType::Outbound => "Stock issue",
            MovementType::Transfer => "Stock transfer",
            MovementType::Adjustment => "Stock adjustment",
        };
        let description = format!("{label} {}", movement.code);

        JournalEntryRequest {
            date: movement.created_at.date_naive(),
            reference: Some(movement.code.clone()),
            description: Some(description.clone()),
            lines: vec![
                JournalLineRequest::debit(debit.id, value, description.clone()),
                JournalLineRequest::credit(credit.id, value, description),
            ],
        }
    }
}
