//! Transactions, storage adapters and the write-path engines.
//!
//! Domain rules live in the `stockpost-*` domain crates; this crate runs them
//! inside an explicit [`UnitOfWork`] and relays notifications via the outbox.

pub mod auto_posting;
pub mod batch_resolver;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod journal_engine;
pub mod ledger_store;
pub mod memory;
pub mod movement_processor;
pub mod order_allocation;
pub mod outbox;
pub mod postgres;
pub mod service;
pub mod uow;


pub use auto_posting::{
    AutoPostingBridge, DerivedPosting, MissingAccountPolicy, PostingOutcome, SkipReason,
};
pub use batch_resolver::BatchResolver;
pub use config::{ConfigError, StockpostConfig};
pub use error::{ServiceError, StoreError};
pub use journal_engine::JournalEngine;
pub use ledger_store::LedgerStore;
pub use memory::{InMemoryDatabase, InMemoryUnitOfWork, LedgerState};
pub use movement_processor::{MovementOutcome, MovementProcessor};
pub use order_allocation::OrderAllocator;
pub use outbox::{OutboxMessage, OutboxRelay, StockTouches};
pub use postgres::{PgDatabase, PgUnitOfWork};
pub use service::{JournalEntryResult, LedgerService, MovementResult, OrderResult};
pub use uow::{Database, UnitOfWork};
