//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::ProductVariantId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants). Infrastructure concerns belong elsewhere.
///
/// Every variant rejects the whole request: none of them is retried or
/// auto-corrected by the write path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Warehouse fields do not fit the movement type.
    #[error("invalid warehouse for movement type: {0}")]
    InvalidWarehouseForMovementType(String),

    /// A consuming movement referenced a batch code that was never received.
    #[error("batch '{code}' not found")]
    BatchNotFound { code: String },

    /// A ledger adjustment would drive a stock record below zero.
    #[error("insufficient stock (available: {available}, requested: {requested})")]
    InsufficientStock { available: Decimal, requested: Decimal },

    /// No single warehouse can satisfy an order line on its own.
    #[error(
        "insufficient stock in any single warehouse (best: {best_available}, requested: {requested})"
    )]
    InsufficientStockSingleWarehouse {
        best_available: Decimal,
        requested: Decimal,
    },

    /// No warehouse holds any stock of the variant.
    #[error("variant {variant_id} is out of stock")]
    OutOfStock { variant_id: ProductVariantId },

    /// Debits and credits differ by more than the rounding tolerance.
    #[error("unbalanced journal entry (debit: {debit}, credit: {credit})")]
    UnbalancedEntry { debit: Decimal, credit: Decimal },

    /// Both sides of a journal entry sum to zero.
    #[error("journal entry has no amounts")]
    EmptyEntry,

    /// A chart-of-accounts code required for posting is not provisioned.
    #[error("account '{code}' is not provisioned for tenant")]
    AccountNotProvisioned { code: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// Data belonging to another tenant was addressed.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_warehouse(msg: impl Into<String>) -> Self {
        Self::InvalidWarehouseForMovementType(msg.into())
    }

    pub fn batch_not_found(code: impl Into<String>) -> Self {
        Self::BatchNotFound { code: code.into() }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn tenant_isolation(msg: impl Into<String>) -> Self {
        Self::TenantIsolation(msg.into())
    }

    /// Stable machine-readable code for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvalidWarehouseForMovementType(_) => "invalid_warehouse_for_movement_type",
            DomainError::BatchNotFound { .. } => "batch_not_found",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::InsufficientStockSingleWarehouse { .. } => {
                "insufficient_stock_single_warehouse"
            }
            DomainError::OutOfStock { .. } => "out_of_stock",
            DomainError::UnbalancedEntry { .. } => "unbalanced_entry",
            DomainError::EmptyEntry => "empty_entry",
            DomainError::AccountNotProvisioned { .. } => "account_not_provisioned",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound(_) => "not_found",
            DomainError::TenantIsolation(_) => "tenant_isolation",
        }
    }
}
