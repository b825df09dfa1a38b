//! Error types for the sync engine.

use tabula_meta::OperationStatus;
use thiserror::Error;
use uuid::Uuid;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The device's schema hash does not match the expected revision.
    ///
    /// Fatal for the cycle; checked before any row is touched.
    #[error("schema drift: device hash `{actual}` does not match expected `{expected}`")]
    SchemaDrift {
        /// Hash the coordinator expects.
        expected: String,
        /// Hash the device reports.
        actual: String,
    },

    /// The device has no schema version row at all.
    #[error("device is not provisioned with a schema version")]
    Unprovisioned,

    /// Network or storage hiccup; retried with backoff.
    #[error("transient I/O failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },

    /// The operation exceeded its wall-clock budget.
    #[error("sync operation exceeded its {budget_ms} ms budget")]
    Timeout {
        /// Configured budget in milliseconds.
        budget_ms: u64,
    },

    /// Another sync operation is already RUNNING for this tenant.
    #[error("a sync operation is already running for tenant `{tenant}`")]
    OperationInProgress {
        /// The tenant with a running operation.
        tenant: String,
    },

    /// Attempted an illegal operation status transition.
    #[error("invalid operation transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: OperationStatus,
        /// Attempted status.
        to: OperationStatus,
    },

    /// Unknown operation id.
    #[error("sync operation {0} not found")]
    OperationNotFound(Uuid),

    /// Unknown conflict id.
    #[error("conflict {0} not found")]
    ConflictNotFound(Uuid),

    /// The conflict already has a recorded resolution.
    #[error("conflict {0} is already resolved")]
    ConflictAlreadyResolved(Uuid),

    /// An optimistic canonical write lost the race.
    ///
    /// Not an error for callers: the coordinator funnels it through
    /// conflict detection.
    #[error("version mismatch on {table}.{record_id}: based on {base:?}, current is {current}")]
    VersionMismatch {
        /// Business table.
        table: String,
        /// Record primary key.
        record_id: String,
        /// Version the write was based on.
        base: Option<u64>,
        /// Version the canonical store currently holds.
        current: u64,
    },

    /// The local replica holds data the engine cannot interpret.
    #[error("corrupt replica state: {message}")]
    Corrupt {
        /// What could not be interpreted.
        message: String,
    },

    /// Local SQLite storage error.
    #[error("local storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Schema loading or generation error.
    #[error("schema error: {0}")]
    Schema(#[from] tabula_schema::SchemaError),

    /// Row snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates a corrupt-state error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried within the same cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transient("connection reset").is_retryable());
        assert!(!SyncError::Timeout { budget_ms: 100 }.is_retryable());
        assert!(!SyncError::Unprovisioned.is_retryable());
        assert!(!SyncError::VersionMismatch {
            table: "students".into(),
            record_id: "s-1".into(),
            base: Some(1),
            current: 2,
        }
        .is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::SchemaDrift {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(err.to_string().contains("aa"));
        assert!(err.to_string().contains("bb"));

        let err = SyncError::OperationInProgress {
            tenant: "tenant-1".into(),
        };
        assert!(err.to_string().contains("tenant-1"));
    }
}
