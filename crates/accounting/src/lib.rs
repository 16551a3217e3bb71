//! Accounting module (double-entry journal).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod journal;
pub mod posting;
pub mod valuation;

pub use account::{Account, AccountKind};
pub use journal::{
    BALANCE_TOLERANCE, JournalEntry, JournalEntryLine, JournalEntryRequest, JournalEntryStatus,
    JournalLineRequest, JournalTotals,
};
pub use posting::{PostingAccounts, PostingRule};
pub use valuation::{FixedUnitCost, ValuationStrategy};
