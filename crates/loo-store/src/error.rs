use loo_types::{LooId, ReportId};

/// Errors from entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The loo's latest report moved since the caller read it.
    #[error("conflicting write for loo {loo}: expected head {expected}, found {found}")]
    Conflict {
        loo: LooId,
        expected: String,
        found: String,
    },

    /// A report with this id is already stored.
    #[error("report already exists: {0}")]
    DuplicateReport(ReportId),

    /// The batch would break a history invariant.
    #[error("integrity violation for loo {loo}: {reason}")]
    IntegrityViolation { loo: LooId, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Whether a read that failed with this error may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    pub(crate) fn integrity(loo: LooId, reason: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            loo,
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
