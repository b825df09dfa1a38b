//! Bookkeeping records.
//!
//! These types mirror the four bookkeeping tables that exist on every
//! local replica. They describe the history and state of synchronization,
//! independent of any business data.

use crate::status::{LogLevel, OperationStatus, OperationType, Resolution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sync cycle, from creation to its terminal state.
///
/// Created when the coordinator begins a cycle, mutated only by the
/// coordinator, terminal once status is `Succeeded` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperationRecord {
    /// Operation ID.
    pub id: Uuid,
    /// Tenant this cycle belongs to.
    pub tenant_id: String,
    /// UPLOAD, DOWNLOAD or FULL_SYNC.
    pub operation_type: OperationType,
    /// Current lifecycle state.
    pub status: OperationStatus,
    /// When the cycle was created.
    pub started_at: DateTime<Utc>,
    /// When the cycle reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of records applied in this cycle.
    pub records_count: u64,
    /// Populated when the cycle failed.
    pub error_message: Option<String>,
    /// Free-form metadata, e.g. a reference to a prior attempt.
    pub metadata: Option<serde_json::Value>,
}

impl SyncOperationRecord {
    /// Creates a new operation in the `Pending` state.
    pub fn begin(tenant_id: impl Into<String>, operation_type: OperationType) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            operation_type,
            status: OperationStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            records_count: 0,
            error_message: None,
            metadata: None,
        }
    }

    /// Returns true once the operation can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A detected divergence between a local row and its canonical copy.
///
/// `local_data` and `remote_data` are captured verbatim at detection time
/// and never edited afterwards; resolution only records the decision and
/// the audit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict ID.
    pub id: Uuid,
    /// Tenant the record belongs to.
    pub tenant_id: String,
    /// Operation that detected the divergence.
    pub operation_id: Uuid,
    /// Mirrored business table.
    pub table_name: String,
    /// Primary key of the diverged record.
    pub record_id: String,
    /// Local row snapshot as of detection time.
    pub local_data: serde_json::Value,
    /// Canonical row snapshot as of detection time.
    pub remote_data: serde_json::Value,
    /// Recorded decision, if any.
    pub resolution: Option<Resolution>,
    /// Who supplied the resolution.
    pub resolved_by: Option<String>,
    /// When the resolution was recorded.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the divergence was detected.
    pub created_at: DateTime<Utc>,
}

impl SyncConflict {
    /// Creates an unresolved conflict with verbatim snapshots.
    pub fn detected(
        tenant_id: impl Into<String>,
        operation_id: Uuid,
        table_name: impl Into<String>,
        record_id: impl Into<String>,
        local_data: serde_json::Value,
        remote_data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            operation_id,
            table_name: table_name.into(),
            record_id: record_id.into(),
            local_data,
            remote_data,
            resolution: None,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    /// Returns true if a resolution has been recorded.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// One append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    /// Entry ID.
    pub id: Uuid,
    /// Tenant the entry belongs to.
    pub tenant_id: String,
    /// Operation the entry belongs to, if any.
    pub operation_id: Option<Uuid>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub details: Option<serde_json::Value>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Creates a log entry for an operation.
    pub fn new(
        tenant_id: impl Into<String>,
        operation_id: Option<Uuid>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            operation_id,
            level,
            message: message.into(),
            details: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches structured context.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The schema revision a device is provisioned with.
///
/// A device's current `schema_hash` must equal the hash the coordinator
/// expects before any sync operation runs; a mismatch is schema drift and
/// aborts the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Monotonically increasing revision number.
    pub version: u32,
    /// Hex SHA-256 digest of the generated DDL.
    pub schema_hash: String,
    /// When the revision was applied on this device.
    pub applied_at: DateTime<Utc>,
}

impl SchemaVersion {
    /// Creates a schema version applied now.
    pub fn new(version: u32, schema_hash: impl Into<String>) -> Self {
        Self {
            version,
            schema_hash: schema_hash.into(),
            applied_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_begins_pending() {
        let op = SyncOperationRecord::begin("tenant-1", OperationType::Upload);
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.records_count, 0);
        assert!(op.completed_at.is_none());
        assert!(!op.is_terminal());
    }

    #[test]
    fn conflict_snapshots_are_verbatim() {
        let local = json!({"name": "Ada", "level": 3});
        let remote = json!({"name": "Ada", "level": 4});
        let conflict = SyncConflict::detected(
            "tenant-1",
            Uuid::new_v4(),
            "students",
            "s-1",
            local.clone(),
            remote.clone(),
        );

        assert_eq!(conflict.local_data, local);
        assert_eq!(conflict.remote_data, remote);
        assert!(!conflict.is_resolved());
    }

    #[test]
    fn log_entry_details() {
        let entry = SyncLogEntry::new("tenant-1", None, LogLevel::Info, "cycle started")
            .with_details(json!({"batch": 100}));
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.details, Some(json!({"batch": 100})));
    }
}
