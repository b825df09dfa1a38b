//! Row snapshots exchanged between a replica and the canonical store.

use crate::status::SyncStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business row as it exists on one device.
///
/// Carries the three injected sync columns plus the last canonical
/// version this device synchronized, which anchors divergence checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRow {
    /// Primary key of the record.
    pub record_id: String,
    /// Business columns as a JSON document.
    pub data: serde_json::Value,
    /// Lifecycle state on this device.
    pub sync_status: SyncStatus,
    /// Last local mutation time.
    pub local_updated_at: DateTime<Utc>,
    /// Provenance of the last local write.
    pub local_device_id: String,
    /// Canonical version this device last saw for the record.
    ///
    /// `None` means the record was created locally and has never reached
    /// the canonical store.
    pub last_synced_version: Option<u64>,
}

impl LocalRow {
    /// Creates a pending row for a fresh local mutation.
    pub fn pending(
        record_id: impl Into<String>,
        data: serde_json::Value,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            data,
            sync_status: SyncStatus::Pending,
            local_updated_at: Utc::now(),
            local_device_id: device_id.into(),
            last_synced_version: None,
        }
    }

    /// Creates a row that matches a canonical version.
    pub fn synced(
        record_id: impl Into<String>,
        data: serde_json::Value,
        device_id: impl Into<String>,
        version: u64,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            data,
            sync_status: SyncStatus::Synced,
            local_updated_at: Utc::now(),
            local_device_id: device_id.into(),
            last_synced_version: Some(version),
        }
    }

    /// Returns true if the row has an unsynchronized local mutation.
    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }
}

/// A record as the canonical store currently holds it.
///
/// `version` increases monotonically per record on every accepted write;
/// `sequence` orders the change feed globally for DOWNLOAD cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Business table the record lives in.
    pub table: String,
    /// Primary key of the record.
    pub record_id: String,
    /// Business columns as a JSON document.
    pub data: serde_json::Value,
    /// Per-record optimistic version.
    pub version: u64,
    /// Device that performed the last accepted write.
    pub modified_by: String,
    /// Position in the canonical change feed.
    pub sequence: u64,
}

impl CanonicalRecord {
    /// Creates a canonical record.
    pub fn new(
        table: impl Into<String>,
        record_id: impl Into<String>,
        data: serde_json::Value,
        version: u64,
        modified_by: impl Into<String>,
        sequence: u64,
    ) -> Self {
        Self {
            table: table.into(),
            record_id: record_id.into(),
            data,
            version,
            modified_by: modified_by.into(),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pending_row_defaults() {
        let row = LocalRow::pending("s-1", json!({"name": "Ada"}), "device-a");
        assert!(row.is_pending());
        assert_eq!(row.last_synced_version, None);
        assert_eq!(row.local_device_id, "device-a");
    }

    #[test]
    fn synced_row_records_version() {
        let row = LocalRow::synced("s-1", json!({"name": "Ada"}), "device-a", 7);
        assert!(!row.is_pending());
        assert_eq!(row.last_synced_version, Some(7));
    }
}
