//! An in-memory sync deployment for integration tests.

use crate::fixtures::{fixture_generated, fixture_schema};
use tabula_meta::{LocalRow, OperationType, SchemaVersion, SyncOperationRecord};
use tabula_sync::memory::{MemoryCanonicalStore, MemoryLocalStore, MemoryMetadataStore};
use tabula_sync::store::LocalStore;
use tabula_sync::{SqliteReplica, SyncConfig, SyncCoordinator};

/// The tenant every harness runs as.
pub const TENANT: &str = "tenant-1";

/// The device id every harness syncs from.
pub const DEVICE: &str = "device-a";

/// One provisioned device, a canonical store and bookkeeping, all in
/// memory.
///
/// The harness owns the stores so tests can inspect them after a cycle;
/// [`SyncHarness::coordinator`] borrows them for the duration of a run.
pub struct SyncHarness {
    /// The device-local replica.
    pub local: MemoryLocalStore,
    /// The canonical store.
    pub canonical: MemoryCanonicalStore,
    /// The bookkeeping store.
    pub metadata: MemoryMetadataStore,
    /// Coordinator configuration, editable before the first run.
    pub config: SyncConfig,
}

impl SyncHarness {
    /// Creates a harness provisioned with the fixture schema.
    pub fn new() -> Self {
        let generated = fixture_generated();
        let local = MemoryLocalStore::new(&["schools", "students"]);
        local
            .set_schema_version(&SchemaVersion::new(1, generated.hash.clone()))
            .expect("in-memory store should accept a schema version");
        Self {
            local,
            canonical: MemoryCanonicalStore::new(),
            metadata: MemoryMetadataStore::new(),
            config: SyncConfig::new(DEVICE, generated.hash),
        }
    }

    /// Replaces the coordinator configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Borrows the stores into a coordinator.
    pub fn coordinator(
        &self,
    ) -> SyncCoordinator<&MemoryLocalStore, &MemoryCanonicalStore, &MemoryMetadataStore> {
        SyncCoordinator::new(
            TENANT,
            &self.local,
            &self.canonical,
            &self.metadata,
            self.config.clone(),
        )
    }

    /// Writes a pending local mutation.
    pub fn seed_local_pending(&self, table: &str, record_id: &str, data: serde_json::Value) {
        self.local
            .put_local(table, &LocalRow::pending(record_id, data, DEVICE))
            .expect("in-memory store should accept a row");
    }

    /// Writes a local row already synced at a canonical version.
    pub fn seed_local_synced(
        &self,
        table: &str,
        record_id: &str,
        data: serde_json::Value,
        version: u64,
    ) {
        self.local
            .put_local(table, &LocalRow::synced(record_id, data, DEVICE, version))
            .expect("in-memory store should accept a row");
    }

    /// Writes a canonical record directly and returns its version.
    pub fn seed_remote(&self, table: &str, record_id: &str, data: serde_json::Value) -> u64 {
        self.canonical.seed(table, record_id, data)
    }

    /// Runs one cycle and returns its journal record.
    ///
    /// Panics if the cycle could not even be journaled; a FAILED record
    /// is returned, not panicked on.
    pub fn run(&self, operation_type: OperationType) -> SyncOperationRecord {
        let coordinator = self.coordinator();
        let id = coordinator
            .begin_sync(operation_type)
            .expect("cycle should be journaled");
        coordinator
            .get_sync_status(id)
            .expect("journal record should exist")
    }
}

impl Default for SyncHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Provisions a fresh in-memory SQLite replica with the fixture schema.
pub fn fixture_replica() -> SqliteReplica {
    let schema = fixture_schema();
    let generated = fixture_generated();
    let conn = rusqlite::Connection::open_in_memory().expect("in-memory SQLite should open");
    SqliteReplica::provision(
        conn,
        &schema,
        &generated.ddl,
        SchemaVersion::new(1, generated.hash),
    )
    .expect("fixture DDL should provision")
}

/// Provisions a file-backed replica in a temporary directory.
///
/// Returns the directory guard alongside the replica; dropping it removes
/// the database file.
pub fn fixture_replica_file() -> (SqliteReplica, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("temp directory should be created");
    let schema = fixture_schema();
    let generated = fixture_generated();
    let conn =
        rusqlite::Connection::open(dir.path().join("replica.db")).expect("SQLite should open");
    let replica = SqliteReplica::provision(
        conn,
        &schema,
        &generated.ddl,
        SchemaVersion::new(1, generated.hash),
    )
    .expect("fixture DDL should provision");
    (replica, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_meta::OperationStatus;

    #[test]
    fn harness_round_trips_a_full_sync() {
        let harness = SyncHarness::new();
        harness.seed_local_pending("students", "s-1", crate::fixtures::student("s-1", "Ada", 3.9));

        let record = harness.run(OperationType::FullSync);
        assert_eq!(record.status, OperationStatus::Succeeded);
        assert_eq!(record.records_count, 1);
    }

    #[test]
    fn fixture_replica_is_provisioned() {
        let replica = fixture_replica();
        assert!(replica.schema_version().unwrap().is_some());
        assert_eq!(replica.tables().unwrap().len(), 2);
    }
}
