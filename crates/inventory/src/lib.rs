//! Inventory domain module.
//!
//! This crate contains the business rules for stock ledgers, batches and
//! movements, implemented purely as deterministic domain logic (no IO, no
//! storage). Persistence and transactions live in `stockpost-infra`.

pub mod batch;
pub mod movement;
pub mod stock;

pub use batch::{Batch, BatchDecision, normalize_batch_code};
pub use movement::{
    LedgerDelta, Movement, MovementItem, MovementItemRequest, MovementRequest, MovementRoute,
    MovementStatus, MovementType,
};
pub use stock::{StockKey, StockRecord};
