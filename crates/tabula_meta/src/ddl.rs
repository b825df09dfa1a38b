//! Bookkeeping DDL.
//!
//! These four tables exist on every local replica regardless of the
//! mirrored business schema. The generator appends this text to every
//! emitted artifact so the schema hash covers it.

/// Returns the DDL for the four bookkeeping tables and their indexes.
pub fn bookkeeping_ddl() -> &'static str {
    "\
CREATE TABLE sync_operations (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    operation_type TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    records_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    metadata TEXT
);
CREATE INDEX idx_sync_operations_tenant_status ON sync_operations(tenant_id, status);
CREATE INDEX idx_sync_operations_started_at ON sync_operations(started_at);

CREATE TABLE sync_conflicts (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    operation_id TEXT NOT NULL REFERENCES sync_operations(id),
    table_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    local_data TEXT NOT NULL,
    remote_data TEXT NOT NULL,
    resolution TEXT,
    resolved_by TEXT,
    resolved_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX idx_sync_conflicts_tenant ON sync_conflicts(tenant_id);
CREATE INDEX idx_sync_conflicts_record ON sync_conflicts(table_name, record_id);

CREATE TABLE sync_logs (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    operation_id TEXT,
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX idx_sync_logs_operation ON sync_logs(operation_id);
CREATE INDEX idx_sync_logs_created_at ON sync_logs(created_at);

CREATE TABLE schema_version (
    version INTEGER PRIMARY KEY,
    schema_hash TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_all_four_tables() {
        let ddl = bookkeeping_ddl();
        for table in ["sync_operations", "sync_conflicts", "sync_logs", "schema_version"] {
            assert!(
                ddl.contains(&format!("CREATE TABLE {table} (")),
                "missing {table}"
            );
        }
    }

    #[test]
    fn conflicts_reference_operations() {
        assert!(bookkeeping_ddl().contains("REFERENCES sync_operations(id)"));
    }
}
