//! Storage traits the coordinator drives.
//!
//! Three seams: the local replica ([`LocalStore`]), the canonical store
//! ([`CanonicalStore`]) and the bookkeeping tables ([`MetadataStore`]).
//! The coordinator is generic over all three, so tests run against the
//! in-memory implementations and production runs against SQLite plus a
//! real transport.

use crate::error::SyncResult;
use tabula_meta::{
    CanonicalRecord, LocalRow, OperationStatus, SchemaVersion, SyncConflict, SyncLogEntry,
    SyncOperationRecord,
};
use uuid::Uuid;

/// The device-local replica of the mirrored business tables.
pub trait LocalStore {
    /// Returns the schema revision the device is provisioned with.
    fn schema_version(&self) -> SyncResult<Option<SchemaVersion>>;

    /// Records a newly applied schema revision.
    fn set_schema_version(&self, version: &SchemaVersion) -> SyncResult<()>;

    /// Returns the mirrored business tables, in schema order.
    fn tables(&self) -> SyncResult<Vec<String>>;

    /// Fetches one row by primary key.
    fn get_row(&self, table: &str, record_id: &str) -> SyncResult<Option<LocalRow>>;

    /// Returns up to `limit` rows with PENDING status, oldest local
    /// mutation first.
    fn pending_rows(&self, table: &str, limit: usize) -> SyncResult<Vec<LocalRow>>;

    /// Writes a row as a local mutation.
    fn put_local(&self, table: &str, row: &LocalRow) -> SyncResult<()>;

    /// Replaces a row with the canonical copy and marks it SYNCED.
    fn overwrite_from_remote(&self, record: &CanonicalRecord, device_id: &str) -> SyncResult<()>;

    /// Marks a row SYNCED at the given canonical version.
    fn mark_synced(&self, table: &str, record_id: &str, version: u64) -> SyncResult<()>;

    /// Marks a row CONFLICT; its data is left untouched.
    fn mark_conflict(&self, table: &str, record_id: &str) -> SyncResult<()>;

    /// Returns the last fully applied change-feed position.
    fn download_cursor(&self) -> SyncResult<u64>;

    /// Advances the change-feed position.
    fn set_download_cursor(&self, sequence: u64) -> SyncResult<()>;
}

/// The authoritative store reached over the network.
pub trait CanonicalStore {
    /// Fetches the current canonical copy of a record.
    fn fetch(&self, table: &str, record_id: &str) -> SyncResult<Option<CanonicalRecord>>;

    /// Applies a write optimistically.
    ///
    /// `base_version` is the canonical version the write was based on,
    /// `None` for a record the device created. Returns the new version on
    /// success and [`SyncError::VersionMismatch`](crate::SyncError::VersionMismatch)
    /// when the record moved on since `base_version`.
    fn apply(
        &self,
        table: &str,
        record_id: &str,
        data: &serde_json::Value,
        base_version: Option<u64>,
        device_id: &str,
    ) -> SyncResult<u64>;

    /// Returns up to `limit` change-feed entries after `cursor`, in
    /// sequence order.
    fn changes_since(&self, cursor: u64, limit: usize) -> SyncResult<Vec<CanonicalRecord>>;
}

/// The bookkeeping tables: operations, conflicts and the audit log.
pub trait MetadataStore {
    /// Inserts a new operation record.
    fn create_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()>;

    /// Replaces an operation record.
    ///
    /// Implementations must reject transitions
    /// [`OperationStatus::can_transition_to`] forbids.
    fn update_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()>;

    /// Fetches an operation by id.
    fn get_operation(&self, id: Uuid) -> SyncResult<Option<SyncOperationRecord>>;

    /// Returns the RUNNING operation for a tenant, if any.
    fn running_operation(&self, tenant_id: &str) -> SyncResult<Option<SyncOperationRecord>>;

    /// Inserts a detected conflict.
    fn insert_conflict(&self, conflict: &SyncConflict) -> SyncResult<()>;

    /// Fetches a conflict by id.
    fn get_conflict(&self, id: Uuid) -> SyncResult<Option<SyncConflict>>;

    /// Returns the unresolved conflict for a record, if one exists.
    fn unresolved_conflict(&self, table: &str, record_id: &str)
        -> SyncResult<Option<SyncConflict>>;

    /// Returns all unresolved conflicts for a tenant, oldest first.
    fn pending_conflicts(&self, tenant_id: &str) -> SyncResult<Vec<SyncConflict>>;

    /// Records a resolution on a conflict.
    fn record_resolution(&self, conflict: &SyncConflict) -> SyncResult<()>;

    /// Appends an audit log entry.
    fn append_log(&self, entry: &SyncLogEntry) -> SyncResult<()>;
}

impl<T: LocalStore> LocalStore for &T {
    fn schema_version(&self) -> SyncResult<Option<SchemaVersion>> {
        (**self).schema_version()
    }

    fn set_schema_version(&self, version: &SchemaVersion) -> SyncResult<()> {
        (**self).set_schema_version(version)
    }

    fn tables(&self) -> SyncResult<Vec<String>> {
        (**self).tables()
    }

    fn get_row(&self, table: &str, record_id: &str) -> SyncResult<Option<LocalRow>> {
        (**self).get_row(table, record_id)
    }

    fn pending_rows(&self, table: &str, limit: usize) -> SyncResult<Vec<LocalRow>> {
        (**self).pending_rows(table, limit)
    }

    fn put_local(&self, table: &str, row: &LocalRow) -> SyncResult<()> {
        (**self).put_local(table, row)
    }

    fn overwrite_from_remote(&self, record: &CanonicalRecord, device_id: &str) -> SyncResult<()> {
        (**self).overwrite_from_remote(record, device_id)
    }

    fn mark_synced(&self, table: &str, record_id: &str, version: u64) -> SyncResult<()> {
        (**self).mark_synced(table, record_id, version)
    }

    fn mark_conflict(&self, table: &str, record_id: &str) -> SyncResult<()> {
        (**self).mark_conflict(table, record_id)
    }

    fn download_cursor(&self) -> SyncResult<u64> {
        (**self).download_cursor()
    }

    fn set_download_cursor(&self, sequence: u64) -> SyncResult<()> {
        (**self).set_download_cursor(sequence)
    }
}

impl<T: CanonicalStore> CanonicalStore for &T {
    fn fetch(&self, table: &str, record_id: &str) -> SyncResult<Option<CanonicalRecord>> {
        (**self).fetch(table, record_id)
    }

    fn apply(
        &self,
        table: &str,
        record_id: &str,
        data: &serde_json::Value,
        base_version: Option<u64>,
        device_id: &str,
    ) -> SyncResult<u64> {
        (**self).apply(table, record_id, data, base_version, device_id)
    }

    fn changes_since(&self, cursor: u64, limit: usize) -> SyncResult<Vec<CanonicalRecord>> {
        (**self).changes_since(cursor, limit)
    }
}

impl<T: MetadataStore> MetadataStore for &T {
    fn create_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        (**self).create_operation(operation)
    }

    fn update_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        (**self).update_operation(operation)
    }

    fn get_operation(&self, id: Uuid) -> SyncResult<Option<SyncOperationRecord>> {
        (**self).get_operation(id)
    }

    fn running_operation(&self, tenant_id: &str) -> SyncResult<Option<SyncOperationRecord>> {
        (**self).running_operation(tenant_id)
    }

    fn insert_conflict(&self, conflict: &SyncConflict) -> SyncResult<()> {
        (**self).insert_conflict(conflict)
    }

    fn get_conflict(&self, id: Uuid) -> SyncResult<Option<SyncConflict>> {
        (**self).get_conflict(id)
    }

    fn unresolved_conflict(
        &self,
        table: &str,
        record_id: &str,
    ) -> SyncResult<Option<SyncConflict>> {
        (**self).unresolved_conflict(table, record_id)
    }

    fn pending_conflicts(&self, tenant_id: &str) -> SyncResult<Vec<SyncConflict>> {
        (**self).pending_conflicts(tenant_id)
    }

    fn record_resolution(&self, conflict: &SyncConflict) -> SyncResult<()> {
        (**self).record_resolution(conflict)
    }

    fn append_log(&self, entry: &SyncLogEntry) -> SyncResult<()> {
        (**self).append_log(entry)
    }
}

/// Guard used by [`MetadataStore`] implementations before an update.
pub(crate) fn check_transition(
    from: OperationStatus,
    to: OperationStatus,
) -> SyncResult<()> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(crate::SyncError::InvalidTransition { from, to })
    }
}
