//! The sync coordinator.
//!
//! Drives UPLOAD, DOWNLOAD and FULL_SYNC cycles against the three store
//! seams. One coordinator serves one tenant on one device; at most one
//! operation runs at a time per tenant.
//!
//! Every cycle is journaled in `sync_operations`: created PENDING, moved
//! to RUNNING, and finished SUCCEEDED or FAILED with the applied-record
//! count either way. `begin_sync` only returns an error when no operation
//! record was created at all; everything that fails mid-cycle lands in
//! the record's `error_message` instead.

use crate::config::SyncConfig;
use crate::conflict::is_divergent;
use crate::error::{SyncError, SyncResult};
use crate::log::AuditLog;
use crate::store::{CanonicalStore, LocalStore, MetadataStore};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::{Duration, Instant};
use tabula_meta::{
    LocalRow, OperationStatus, OperationType, Resolution, SyncConflict, SyncOperationRecord,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Wall-clock budget for one cycle.
///
/// The budget is only enforced once at least one record has been applied,
/// so even a zero budget makes progress. Canonical versions start at 1;
/// the prefix applied before expiry is always kept.
struct Deadline {
    at: Option<Instant>,
    budget_ms: u64,
}

impl Deadline {
    fn new(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.map(|t| Instant::now() + t),
            budget_ms: timeout.map_or(0, |t| t.as_millis() as u64),
        }
    }

    fn check(&self, applied: u64) -> SyncResult<()> {
        if applied == 0 {
            return Ok(());
        }
        match self.at {
            Some(at) if Instant::now() >= at => Err(SyncError::Timeout {
                budget_ms: self.budget_ms,
            }),
            _ => Ok(()),
        }
    }
}

/// Coordinates sync cycles for one tenant on one device.
pub struct SyncCoordinator<L, C, M> {
    tenant_id: String,
    local: L,
    canonical: C,
    metadata: M,
    config: SyncConfig,
}

impl<L, C, M> SyncCoordinator<L, C, M>
where
    L: LocalStore,
    C: CanonicalStore,
    M: MetadataStore,
{
    /// Creates a coordinator.
    pub fn new(
        tenant_id: impl Into<String>,
        local: L,
        canonical: C,
        metadata: M,
        config: SyncConfig,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            local,
            canonical,
            metadata,
            config,
        }
    }

    /// The local replica.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// The bookkeeping store.
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Runs a sync cycle to completion and returns its operation id.
    ///
    /// Fails directly only when another operation is already RUNNING for
    /// this tenant; any failure after the operation record exists is
    /// reported through that record.
    pub fn begin_sync(&self, operation_type: OperationType) -> SyncResult<Uuid> {
        if let Some(running) = self.metadata.running_operation(&self.tenant_id)? {
            debug!(operation = %running.id, "refusing concurrent sync");
            return Err(SyncError::OperationInProgress {
                tenant: self.tenant_id.clone(),
            });
        }

        let mut operation = SyncOperationRecord::begin(&self.tenant_id, operation_type);
        self.metadata.create_operation(&operation)?;

        operation.status = OperationStatus::Running;
        self.metadata.update_operation(&operation)?;

        let log = AuditLog::new(&self.metadata, &self.tenant_id);
        log.info(
            Some(operation.id),
            &format!("{} started", operation_type.as_str()),
        );
        info!(operation = %operation.id, kind = operation_type.as_str(), "sync started");

        let deadline = Deadline::new(self.config.operation_timeout);
        let mut applied = 0u64;
        let result = self.check_schema().and_then(|()| match operation_type {
            OperationType::Upload => self.run_upload(operation.id, &deadline, &mut applied),
            OperationType::Download => self.run_download(operation.id, &deadline, &mut applied),
            OperationType::FullSync => self
                .run_upload(operation.id, &deadline, &mut applied)
                .and_then(|()| self.run_download(operation.id, &deadline, &mut applied)),
        });

        operation.records_count = applied;
        operation.completed_at = Some(Utc::now());
        match result {
            Ok(()) => {
                operation.status = OperationStatus::Succeeded;
                self.metadata.update_operation(&operation)?;
                log.info(
                    Some(operation.id),
                    &format!("{} succeeded, {applied} records", operation_type.as_str()),
                );
                info!(operation = %operation.id, applied, "sync succeeded");
            }
            Err(err) => {
                operation.status = OperationStatus::Failed;
                operation.error_message = Some(err.to_string());
                self.metadata.update_operation(&operation)?;
                log.error(
                    Some(operation.id),
                    &format!("{} failed: {err}", operation_type.as_str()),
                );
                warn!(operation = %operation.id, applied, error = %err, "sync failed");
            }
        }

        Ok(operation.id)
    }

    /// Fetches the journal record for an operation.
    pub fn get_sync_status(&self, operation_id: Uuid) -> SyncResult<SyncOperationRecord> {
        self.metadata
            .get_operation(operation_id)?
            .ok_or(SyncError::OperationNotFound(operation_id))
    }

    /// Returns this tenant's unresolved conflicts, oldest first.
    pub fn get_pending_conflicts(&self) -> SyncResult<Vec<SyncConflict>> {
        self.metadata.pending_conflicts(&self.tenant_id)
    }

    /// Resolves a conflict with an operator-supplied decision.
    pub fn resolve_conflict(
        &self,
        conflict_id: Uuid,
        resolution: Resolution,
        resolved_by: &str,
    ) -> SyncResult<()> {
        let conflict = self
            .metadata
            .get_conflict(conflict_id)?
            .ok_or(SyncError::ConflictNotFound(conflict_id))?;
        if conflict.is_resolved() {
            return Err(SyncError::ConflictAlreadyResolved(conflict_id));
        }
        self.apply_resolution(conflict, resolution, resolved_by)
    }

    fn check_schema(&self) -> SyncResult<()> {
        let version = self.local.schema_version()?.ok_or(SyncError::Unprovisioned)?;
        if version.schema_hash != self.config.expected_schema_hash {
            return Err(SyncError::SchemaDrift {
                expected: self.config.expected_schema_hash.clone(),
                actual: version.schema_hash,
            });
        }
        Ok(())
    }

    fn run_upload(
        &self,
        operation_id: Uuid,
        deadline: &Deadline,
        applied: &mut u64,
    ) -> SyncResult<()> {
        let tables = self.local.tables()?;
        loop {
            // Merge the per-table batches so mutations are applied oldest
            // first across the whole replica, not just within one table.
            let mut merged: Vec<(String, LocalRow)> = Vec::new();
            let mut bound: Option<(DateTime<Utc>, String)> = None;
            for table in &tables {
                let batch = self
                    .local
                    .pending_rows(table, self.config.upload_batch_size)?;
                if batch.len() == self.config.upload_batch_size {
                    // A full batch may hide rows older than another
                    // table's fetched tail; its last row bounds what can
                    // be ordered this pass.
                    if let Some(last) = batch.last() {
                        let key = (last.local_updated_at, last.record_id.clone());
                        bound = Some(match bound.take() {
                            Some(b) if b <= key => b,
                            _ => key,
                        });
                    }
                }
                merged.extend(batch.into_iter().map(|row| (table.clone(), row)));
            }
            if merged.is_empty() {
                break;
            }
            merged.sort_by(|(_, a), (_, b)| {
                a.local_updated_at
                    .cmp(&b.local_updated_at)
                    .then_with(|| a.record_id.cmp(&b.record_id))
            });

            for (table, row) in &merged {
                if let Some((at, id)) = &bound {
                    if (&row.local_updated_at, &row.record_id) > (at, id) {
                        break;
                    }
                }
                deadline.check(*applied)?;
                self.upload_row(operation_id, table, row, applied)?;
            }
        }
        Ok(())
    }

    fn upload_row(
        &self,
        operation_id: Uuid,
        table: &str,
        row: &LocalRow,
        applied: &mut u64,
    ) -> SyncResult<()> {
        let result = self.with_retry(|| {
            self.canonical.apply(
                table,
                &row.record_id,
                &row.data,
                row.last_synced_version,
                &self.config.device_id,
            )
        });
        match result {
            Ok(version) => {
                self.local.mark_synced(table, &row.record_id, version)?;
                *applied += 1;
                Ok(())
            }
            Err(SyncError::VersionMismatch { .. }) => {
                let remote = self
                    .with_retry(|| self.canonical.fetch(table, &row.record_id))?
                    .map_or(serde_json::Value::Null, |r| r.data);
                self.raise_conflict(operation_id, table, row, remote)
            }
            Err(err) => Err(err),
        }
    }

    fn run_download(
        &self,
        operation_id: Uuid,
        deadline: &Deadline,
        applied: &mut u64,
    ) -> SyncResult<()> {
        let tables = self.local.tables()?;
        let mut cursor = self.local.download_cursor()?;
        loop {
            let batch = self.with_retry(|| {
                self.canonical
                    .changes_since(cursor, self.config.download_batch_size)
            })?;
            if batch.is_empty() {
                break;
            }
            for record in &batch {
                deadline.check(*applied)?;

                if tables.iter().any(|t| t == &record.table) {
                    match self.local.get_row(&record.table, &record.record_id)? {
                        // Conflicted rows are frozen until resolved.
                        Some(row) if row.sync_status == tabula_meta::SyncStatus::Conflict => {}
                        Some(row) if is_divergent(&row, record.version) => {
                            self.raise_conflict(
                                operation_id,
                                &record.table,
                                &row,
                                record.data.clone(),
                            )?;
                        }
                        // Already at this version, typically our own
                        // upload echoing back through the feed.
                        Some(row) if row.last_synced_version == Some(record.version) => {}
                        _ => {
                            self.local
                                .overwrite_from_remote(record, &self.config.device_id)?;
                            *applied += 1;
                        }
                    }
                }

                cursor = record.sequence;
                self.local.set_download_cursor(cursor)?;
            }
        }
        Ok(())
    }

    /// Journals a divergence, freezes the local row and, if the policy
    /// allows, resolves it immediately.
    ///
    /// A record with an unresolved conflict never gets a second conflict
    /// row; repeated detections are deduplicated.
    fn raise_conflict(
        &self,
        operation_id: Uuid,
        table: &str,
        row: &LocalRow,
        remote_data: serde_json::Value,
    ) -> SyncResult<()> {
        if self
            .metadata
            .unresolved_conflict(table, &row.record_id)?
            .is_some()
        {
            self.local.mark_conflict(table, &row.record_id)?;
            return Ok(());
        }

        let conflict = SyncConflict::detected(
            &self.tenant_id,
            operation_id,
            table,
            &row.record_id,
            row.data.clone(),
            remote_data,
        );
        self.metadata.insert_conflict(&conflict)?;
        self.local.mark_conflict(table, &row.record_id)?;

        let log = AuditLog::new(&self.metadata, &self.tenant_id);
        log.warning(
            Some(operation_id),
            "conflict detected",
            json!({"table": table, "record_id": row.record_id, "conflict_id": conflict.id}),
        );
        warn!(table, record_id = %row.record_id, "conflict detected");

        if self.config.default_policy.auto_resolves() {
            self.apply_resolution(conflict, self.config.default_policy.as_resolution(), "policy")?;
        }
        Ok(())
    }

    /// Applies a resolution's side effects, then records the decision.
    ///
    /// Side effects come first so a failure leaves the conflict
    /// unresolved and the resolution retryable.
    fn apply_resolution(
        &self,
        mut conflict: SyncConflict,
        resolution: Resolution,
        resolved_by: &str,
    ) -> SyncResult<()> {
        let table = conflict.table_name.clone();
        let record_id = conflict.record_id.clone();

        match resolution {
            Resolution::Local => {
                let base = self
                    .with_retry(|| self.canonical.fetch(&table, &record_id))?
                    .map(|r| r.version);
                let version = self.with_retry(|| {
                    self.canonical.apply(
                        &table,
                        &record_id,
                        &conflict.local_data,
                        base,
                        &self.config.device_id,
                    )
                })?;
                self.local.mark_synced(&table, &record_id, version)?;
            }
            Resolution::Remote => {
                match self.with_retry(|| self.canonical.fetch(&table, &record_id))? {
                    Some(record) => self
                        .local
                        .overwrite_from_remote(&record, &self.config.device_id)?,
                    // Deletes are not replicated, so this is not expected;
                    // version 0 never matches a live canonical version.
                    None => self.local.mark_synced(&table, &record_id, 0)?,
                }
            }
            Resolution::Manual => {
                // The operator reconciled both sides out of band; the row
                // keeps its data and leaves the frozen state.
                let version = self
                    .with_retry(|| self.canonical.fetch(&table, &record_id))?
                    .map_or(0, |r| r.version);
                self.local.mark_synced(&table, &record_id, version)?;
            }
        }

        conflict.resolution = Some(resolution);
        conflict.resolved_by = Some(resolved_by.to_string());
        conflict.resolved_at = Some(Utc::now());
        self.metadata.record_resolution(&conflict)?;

        let log = AuditLog::new(&self.metadata, &self.tenant_id);
        log.info(
            Some(conflict.operation_id),
            &format!(
                "conflict {} resolved {} by {resolved_by}",
                conflict.id,
                resolution.as_str()
            ),
        );
        Ok(())
    }

    fn with_retry<T>(&self, mut call: impl FnMut() -> SyncResult<T>) -> SyncResult<T> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
