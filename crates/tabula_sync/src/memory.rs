//! In-memory store implementations.
//!
//! [`MemoryLocalStore`] and [`MemoryMetadataStore`] back tests and
//! prototyping; [`MemoryCanonicalStore`] additionally stands in for the
//! remote side and supports transient-failure injection so retry paths
//! can be exercised deterministically.

use crate::error::{SyncError, SyncResult};
use crate::store::{check_transition, CanonicalStore, LocalStore, MetadataStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tabula_meta::{
    CanonicalRecord, LocalRow, OperationStatus, SchemaVersion, SyncConflict, SyncLogEntry,
    SyncOperationRecord,
};
use uuid::Uuid;

#[derive(Default)]
struct LocalState {
    schema_version: Option<SchemaVersion>,
    tables: Vec<String>,
    rows: BTreeMap<(String, String), LocalRow>,
    cursor: u64,
}

/// An in-memory local replica.
#[derive(Default)]
pub struct MemoryLocalStore {
    state: RwLock<LocalState>,
}

impl MemoryLocalStore {
    /// Creates a replica mirroring the given tables.
    pub fn new(tables: &[&str]) -> Self {
        let store = Self::default();
        store.state.write().tables = tables.iter().map(|t| t.to_string()).collect();
        store
    }

    /// Returns the number of rows across all tables.
    pub fn row_count(&self) -> usize {
        self.state.read().rows.len()
    }
}

impl LocalStore for MemoryLocalStore {
    fn schema_version(&self) -> SyncResult<Option<SchemaVersion>> {
        Ok(self.state.read().schema_version.clone())
    }

    fn set_schema_version(&self, version: &SchemaVersion) -> SyncResult<()> {
        self.state.write().schema_version = Some(version.clone());
        Ok(())
    }

    fn tables(&self) -> SyncResult<Vec<String>> {
        Ok(self.state.read().tables.clone())
    }

    fn get_row(&self, table: &str, record_id: &str) -> SyncResult<Option<LocalRow>> {
        Ok(self
            .state
            .read()
            .rows
            .get(&(table.to_string(), record_id.to_string()))
            .cloned())
    }

    fn pending_rows(&self, table: &str, limit: usize) -> SyncResult<Vec<LocalRow>> {
        let state = self.state.read();
        let mut rows: Vec<LocalRow> = state
            .rows
            .iter()
            .filter(|((t, _), row)| t == table && row.is_pending())
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| {
            a.local_updated_at
                .cmp(&b.local_updated_at)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    fn put_local(&self, table: &str, row: &LocalRow) -> SyncResult<()> {
        self.state
            .write()
            .rows
            .insert((table.to_string(), row.record_id.clone()), row.clone());
        Ok(())
    }

    fn overwrite_from_remote(&self, record: &CanonicalRecord, device_id: &str) -> SyncResult<()> {
        let row = LocalRow::synced(
            record.record_id.clone(),
            record.data.clone(),
            device_id,
            record.version,
        );
        self.state
            .write()
            .rows
            .insert((record.table.clone(), record.record_id.clone()), row);
        Ok(())
    }

    fn mark_synced(&self, table: &str, record_id: &str, version: u64) -> SyncResult<()> {
        let mut state = self.state.write();
        if let Some(row) = state
            .rows
            .get_mut(&(table.to_string(), record_id.to_string()))
        {
            row.sync_status = tabula_meta::SyncStatus::Synced;
            row.last_synced_version = Some(version);
        }
        Ok(())
    }

    fn mark_conflict(&self, table: &str, record_id: &str) -> SyncResult<()> {
        let mut state = self.state.write();
        if let Some(row) = state
            .rows
            .get_mut(&(table.to_string(), record_id.to_string()))
        {
            row.sync_status = tabula_meta::SyncStatus::Conflict;
        }
        Ok(())
    }

    fn download_cursor(&self) -> SyncResult<u64> {
        Ok(self.state.read().cursor)
    }

    fn set_download_cursor(&self, sequence: u64) -> SyncResult<()> {
        self.state.write().cursor = sequence;
        Ok(())
    }
}

#[derive(Default)]
struct CanonicalState {
    records: BTreeMap<(String, String), CanonicalRecord>,
    next_sequence: u64,
    fail_applies: u32,
}

/// An in-memory stand-in for the canonical store.
#[derive(Default)]
pub struct MemoryCanonicalStore {
    state: RwLock<CanonicalState>,
}

impl MemoryCanonicalStore {
    /// Creates an empty canonical store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, bypassing the optimistic check.
    ///
    /// Returns the version assigned to the seeded write.
    pub fn seed(&self, table: &str, record_id: &str, data: serde_json::Value) -> u64 {
        let mut state = self.state.write();
        state.next_sequence += 1;
        let sequence = state.next_sequence;
        let key = (table.to_string(), record_id.to_string());
        let version = state.records.get(&key).map_or(1, |r| r.version + 1);
        state.records.insert(
            key,
            CanonicalRecord::new(table, record_id, data, version, "seed", sequence),
        );
        version
    }

    /// Makes the next `n` `apply` calls fail with a transient error.
    pub fn fail_next_applies(&self, n: u32) {
        self.state.write().fail_applies = n;
    }
}

impl CanonicalStore for MemoryCanonicalStore {
    fn fetch(&self, table: &str, record_id: &str) -> SyncResult<Option<CanonicalRecord>> {
        Ok(self
            .state
            .read()
            .records
            .get(&(table.to_string(), record_id.to_string()))
            .cloned())
    }

    fn apply(
        &self,
        table: &str,
        record_id: &str,
        data: &serde_json::Value,
        base_version: Option<u64>,
        device_id: &str,
    ) -> SyncResult<u64> {
        let mut state = self.state.write();
        if state.fail_applies > 0 {
            state.fail_applies -= 1;
            return Err(SyncError::transient("injected canonical store failure"));
        }

        let key = (table.to_string(), record_id.to_string());
        let current = state.records.get(&key).map(|r| r.version);
        match (base_version, current) {
            // New record, nothing on the other side: accept at version 1.
            (None, None) => {}
            (Some(base), Some(current)) if base == current => {}
            (_, Some(current)) => {
                return Err(SyncError::VersionMismatch {
                    table: table.to_string(),
                    record_id: record_id.to_string(),
                    base: base_version,
                    current,
                });
            }
            (Some(base), None) => {
                return Err(SyncError::VersionMismatch {
                    table: table.to_string(),
                    record_id: record_id.to_string(),
                    base: Some(base),
                    current: 0,
                });
            }
        }

        state.next_sequence += 1;
        let sequence = state.next_sequence;
        let version = current.map_or(1, |v| v + 1);
        state.records.insert(
            key,
            CanonicalRecord::new(table, record_id, data.clone(), version, device_id, sequence),
        );
        Ok(version)
    }

    fn changes_since(&self, cursor: u64, limit: usize) -> SyncResult<Vec<CanonicalRecord>> {
        let state = self.state.read();
        let mut changes: Vec<CanonicalRecord> = state
            .records
            .values()
            .filter(|r| r.sequence > cursor)
            .cloned()
            .collect();
        changes.sort_by_key(|r| r.sequence);
        changes.truncate(limit);
        Ok(changes)
    }
}

#[derive(Default)]
struct MetadataState {
    operations: BTreeMap<Uuid, SyncOperationRecord>,
    conflicts: BTreeMap<Uuid, SyncConflict>,
    logs: Vec<SyncLogEntry>,
    fail_logs: bool,
}

/// In-memory bookkeeping tables.
#[derive(Default)]
pub struct MemoryMetadataStore {
    state: RwLock<MetadataState>,
}

impl MemoryMetadataStore {
    /// Creates empty bookkeeping storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `append_log` call fail.
    pub fn fail_logging(&self) {
        self.state.write().fail_logs = true;
    }

    /// Returns a snapshot of the audit log, oldest first.
    pub fn log_entries(&self) -> Vec<SyncLogEntry> {
        self.state.read().logs.clone()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn create_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        self.state
            .write()
            .operations
            .insert(operation.id, operation.clone());
        Ok(())
    }

    fn update_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        let mut state = self.state.write();
        let existing = state
            .operations
            .get(&operation.id)
            .ok_or(SyncError::OperationNotFound(operation.id))?;
        check_transition(existing.status, operation.status)?;
        state.operations.insert(operation.id, operation.clone());
        Ok(())
    }

    fn get_operation(&self, id: Uuid) -> SyncResult<Option<SyncOperationRecord>> {
        Ok(self.state.read().operations.get(&id).cloned())
    }

    fn running_operation(&self, tenant_id: &str) -> SyncResult<Option<SyncOperationRecord>> {
        Ok(self
            .state
            .read()
            .operations
            .values()
            .find(|op| op.tenant_id == tenant_id && op.status == OperationStatus::Running)
            .cloned())
    }

    fn insert_conflict(&self, conflict: &SyncConflict) -> SyncResult<()> {
        self.state
            .write()
            .conflicts
            .insert(conflict.id, conflict.clone());
        Ok(())
    }

    fn get_conflict(&self, id: Uuid) -> SyncResult<Option<SyncConflict>> {
        Ok(self.state.read().conflicts.get(&id).cloned())
    }

    fn unresolved_conflict(
        &self,
        table: &str,
        record_id: &str,
    ) -> SyncResult<Option<SyncConflict>> {
        Ok(self
            .state
            .read()
            .conflicts
            .values()
            .find(|c| c.table_name == table && c.record_id == record_id && !c.is_resolved())
            .cloned())
    }

    fn pending_conflicts(&self, tenant_id: &str) -> SyncResult<Vec<SyncConflict>> {
        let state = self.state.read();
        let mut conflicts: Vec<SyncConflict> = state
            .conflicts
            .values()
            .filter(|c| c.tenant_id == tenant_id && !c.is_resolved())
            .cloned()
            .collect();
        conflicts.sort_by_key(|c| c.created_at);
        Ok(conflicts)
    }

    fn record_resolution(&self, conflict: &SyncConflict) -> SyncResult<()> {
        let mut state = self.state.write();
        let existing = state
            .conflicts
            .get(&conflict.id)
            .ok_or(SyncError::ConflictNotFound(conflict.id))?;
        if existing.is_resolved() {
            return Err(SyncError::ConflictAlreadyResolved(conflict.id));
        }
        state.conflicts.insert(conflict.id, conflict.clone());
        Ok(())
    }

    fn append_log(&self, entry: &SyncLogEntry) -> SyncResult<()> {
        let mut state = self.state.write();
        if state.fail_logs {
            return Err(SyncError::transient("log sink unavailable"));
        }
        state.logs.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_meta::OperationType;

    #[test]
    fn pending_rows_come_back_oldest_first() {
        let store = MemoryLocalStore::new(&["students"]);
        let mut newer = LocalRow::pending("s-2", json!({}), "device-a");
        let mut older = LocalRow::pending("s-1", json!({}), "device-a");
        older.local_updated_at = newer.local_updated_at - chrono::Duration::seconds(10);
        newer.local_updated_at += chrono::Duration::seconds(10);
        store.put_local("students", &newer).unwrap();
        store.put_local("students", &older).unwrap();

        let rows = store.pending_rows("students", 10).unwrap();
        assert_eq!(rows[0].record_id, "s-1");
        assert_eq!(rows[1].record_id, "s-2");
    }

    #[test]
    fn optimistic_apply_detects_stale_base() {
        let canonical = MemoryCanonicalStore::new();
        let v1 = canonical.seed("students", "s-1", json!({"gpa": 3.0}));
        assert_eq!(v1, 1);
        let v2 = canonical.seed("students", "s-1", json!({"gpa": 3.5}));
        assert_eq!(v2, 2);

        let err = canonical
            .apply("students", "s-1", &json!({"gpa": 4.0}), Some(1), "device-a")
            .unwrap_err();
        assert!(matches!(err, SyncError::VersionMismatch { current: 2, .. }));

        let v3 = canonical
            .apply("students", "s-1", &json!({"gpa": 4.0}), Some(2), "device-a")
            .unwrap();
        assert_eq!(v3, 3);
    }

    #[test]
    fn change_feed_is_ordered_and_bounded() {
        let canonical = MemoryCanonicalStore::new();
        canonical.seed("a", "1", json!({}));
        canonical.seed("a", "2", json!({}));
        canonical.seed("a", "3", json!({}));

        let page = canonical.changes_since(0, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].sequence < page[1].sequence);

        let rest = canonical.changes_since(page[1].sequence, 10).unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn operation_updates_respect_the_state_machine() {
        let meta = MemoryMetadataStore::new();
        let mut op = SyncOperationRecord::begin("tenant-1", OperationType::Upload);
        meta.create_operation(&op).unwrap();

        op.status = OperationStatus::Succeeded;
        assert!(matches!(
            meta.update_operation(&op),
            Err(SyncError::InvalidTransition { .. })
        ));

        op.status = OperationStatus::Running;
        meta.update_operation(&op).unwrap();
        op.status = OperationStatus::Succeeded;
        meta.update_operation(&op).unwrap();
    }

    #[test]
    fn resolving_twice_is_rejected() {
        let meta = MemoryMetadataStore::new();
        let mut conflict = SyncConflict::detected(
            "tenant-1",
            Uuid::new_v4(),
            "students",
            "s-1",
            json!({}),
            json!({}),
        );
        meta.insert_conflict(&conflict).unwrap();

        conflict.resolution = Some(tabula_meta::Resolution::Local);
        meta.record_resolution(&conflict).unwrap();
        assert!(matches!(
            meta.record_resolution(&conflict),
            Err(SyncError::ConflictAlreadyResolved(_))
        ));
    }
}
