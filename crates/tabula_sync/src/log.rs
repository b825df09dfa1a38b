//! Append-only audit log sink.
//!
//! Logging failures must never fail the operation being logged, so every
//! append swallows its error after emitting a `tracing` warning.

use crate::store::MetadataStore;
use tabula_meta::{LogLevel, SyncLogEntry};
use uuid::Uuid;

/// Writes audit entries for one tenant's operations.
pub struct AuditLog<'a, M: MetadataStore> {
    metadata: &'a M,
    tenant_id: String,
}

impl<'a, M: MetadataStore> AuditLog<'a, M> {
    /// Creates an audit log scoped to a tenant.
    pub fn new(metadata: &'a M, tenant_id: impl Into<String>) -> Self {
        Self {
            metadata,
            tenant_id: tenant_id.into(),
        }
    }

    /// Appends an INFO entry.
    pub fn info(&self, operation_id: Option<Uuid>, message: &str) {
        self.append(operation_id, LogLevel::Info, message, None);
    }

    /// Appends a WARNING entry with structured context.
    pub fn warning(
        &self,
        operation_id: Option<Uuid>,
        message: &str,
        details: serde_json::Value,
    ) {
        self.append(operation_id, LogLevel::Warning, message, Some(details));
    }

    /// Appends an ERROR entry.
    pub fn error(&self, operation_id: Option<Uuid>, message: &str) {
        self.append(operation_id, LogLevel::Error, message, None);
    }

    fn append(
        &self,
        operation_id: Option<Uuid>,
        level: LogLevel,
        message: &str,
        details: Option<serde_json::Value>,
    ) {
        let mut entry = SyncLogEntry::new(&self.tenant_id, operation_id, level, message);
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        if let Err(err) = self.metadata.append_log(&entry) {
            tracing::warn!(
                tenant = %self.tenant_id,
                error = %err,
                "failed to append sync log entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMetadataStore;
    use serde_json::json;

    #[test]
    fn entries_are_appended_in_order() {
        let meta = MemoryMetadataStore::new();
        let log = AuditLog::new(&meta, "tenant-1");
        let op = Uuid::new_v4();

        log.info(Some(op), "cycle started");
        log.warning(Some(op), "conflict detected", json!({"table": "students"}));
        log.error(Some(op), "cycle failed");

        let entries = meta.log_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[1].level, LogLevel::Warning);
        assert_eq!(entries[1].details, Some(json!({"table": "students"})));
        assert_eq!(entries[2].level, LogLevel::Error);
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let meta = MemoryMetadataStore::new();
        meta.fail_logging();
        let log = AuditLog::new(&meta, "tenant-1");

        // Must not panic or propagate.
        log.info(None, "still fine");
        assert!(meta.log_entries().is_empty());
    }
}
