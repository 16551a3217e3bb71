//! Infrastructure and orchestration errors.

use thiserror::Error;

use stockpost_core::DomainError;

/// Storage operation error.
///
/// These are **infrastructure errors** (connectivity, isolation conflicts,
/// unreadable rows) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization failure, deadlock or unique violation; the whole
    /// operation may be retried by the caller.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

/// Error returned by the write-path operations.
///
/// Every error aborts the whole operation: the unit of work is rolled back
/// and nothing partial is visible.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable code for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => e.kind(),
            ServiceError::Store(StoreError::Conflict(_)) => "transaction_conflict",
            ServiceError::Store(_) => "storage_failure",
        }
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let e: ServiceError = DomainError::EmptyEntry.into();
        assert_eq!(e.kind(), "empty_entry");
        assert_eq!(e.as_domain(), Some(&DomainError::EmptyEntry));

        let e: ServiceError = StoreError::Conflict("40001".into()).into();
        assert_eq!(e.kind(), "transaction_conflict");
        assert!(e.as_domain().is_none());

        let e: ServiceError = StoreError::Unavailable("down".into()).into();
        assert_eq!(e.kind(), "storage_failure");
    }
}
