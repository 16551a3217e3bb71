//! `stockpost-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the numeric bounds every stored quantity and
//! amount must respect, and the error taxonomy shared by the inventory,
//! accounting and sales crates.

pub mod amount;
pub mod code;
pub mod error;
pub mod id;

pub use code::generate_code;
pub use error::{DomainError, DomainResult};
pub use id::{
    AccountId, BatchId, JournalEntryId, MovementId, OrderId, ProductVariantId, TenantId, UserId,
    WarehouseId,
};
