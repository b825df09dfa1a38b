//! SQLite-backed local replica.
//!
//! [`SqliteReplica`] implements both [`LocalStore`] and [`MetadataStore`]
//! over one `rusqlite` connection: the mirrored business tables and the
//! bookkeeping tables live in the same database file, so a device is one
//! file on disk.
//!
//! Two private tables carry device-local runtime state that is not part
//! of the hashed schema artifact: `_tabula_sync_state` holds the last
//! synced canonical version per row and `_tabula_cursor` the download
//! position.

use crate::error::{SyncError, SyncResult};
use crate::store::{check_transition, LocalStore, MetadataStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tabula_meta::{
    format_timestamp, parse_timestamp, CanonicalRecord, LocalRow, OperationStatus, OperationType,
    Resolution, SchemaVersion, SyncConflict, SyncLogEntry, SyncOperationRecord, SyncStatus,
};
use tabula_schema::{CanonicalSchema, LogicalType};
use uuid::Uuid;

const INTERNAL_DDL: &str = "\
CREATE TABLE IF NOT EXISTS _tabula_sync_state (
    table_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    last_synced_version INTEGER,
    PRIMARY KEY (table_name, record_id)
);
CREATE TABLE IF NOT EXISTS _tabula_cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    sequence INTEGER NOT NULL
);
INSERT OR IGNORE INTO _tabula_cursor (id, sequence) VALUES (1, 0);
";

#[derive(Debug)]
struct TableMeta {
    name: String,
    pk: String,
    columns: Vec<(String, LogicalType)>,
}

/// A device-local replica stored in SQLite.
#[derive(Debug)]
pub struct SqliteReplica {
    conn: Mutex<Connection>,
    tables: Vec<TableMeta>,
}

impl SqliteReplica {
    /// Provisions a fresh database with the generated mirror DDL and
    /// records the schema revision.
    pub fn provision(
        conn: Connection,
        schema: &CanonicalSchema,
        ddl: &str,
        version: SchemaVersion,
    ) -> SyncResult<Self> {
        conn.execute_batch(ddl)?;
        conn.execute_batch(INTERNAL_DDL)?;
        let replica = Self::from_parts(conn, schema)?;
        replica.set_schema_version(&version)?;
        Ok(replica)
    }

    /// Opens an already provisioned database.
    pub fn open(conn: Connection, schema: &CanonicalSchema) -> SyncResult<Self> {
        conn.execute_batch(INTERNAL_DDL)?;
        Self::from_parts(conn, schema)
    }

    fn from_parts(conn: Connection, schema: &CanonicalSchema) -> SyncResult<Self> {
        let mut tables = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let key_columns = table.primary_key();
            // Rows are addressed by one key column; a composite key would
            // silently collapse distinct records onto its first component.
            if key_columns.len() > 1 {
                return Err(SyncError::corrupt(format!(
                    "table `{}` has a composite primary key, which the replica cannot address",
                    table.name
                )));
            }
            let pk = key_columns.first().map(|c| c.name.clone()).ok_or_else(|| {
                SyncError::corrupt(format!("table `{}` has no primary key", table.name))
            })?;
            tables.push(TableMeta {
                name: table.name.clone(),
                pk,
                columns: table
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.logical_type.clone()))
                    .collect(),
            });
        }
        Ok(Self {
            conn: Mutex::new(conn),
            tables,
        })
    }

    fn table(&self, name: &str) -> SyncResult<&TableMeta> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SyncError::corrupt(format!("unknown table `{name}`")))
    }

    fn write_row(&self, meta: &TableMeta, row: &LocalRow) -> SyncResult<()> {
        let conn = self.conn.lock();

        // Columns the snapshot does not carry are omitted so declared
        // defaults apply instead of an explicit NULL.
        let mut names: Vec<&str> = Vec::with_capacity(meta.columns.len() + 3);
        let mut values: Vec<Value> = Vec::with_capacity(meta.columns.len() + 3);
        for (name, logical) in &meta.columns {
            match row.data.get(name) {
                Some(v) => {
                    names.push(name.as_str());
                    values.push(json_to_sql(v, logical));
                }
                // The key column always holds the record id, even when
                // the snapshot omits it.
                None if *name == meta.pk => {
                    names.push(name.as_str());
                    values.push(Value::Text(row.record_id.clone()));
                }
                None => {}
            }
        }
        names.extend(["sync_status", "local_updated_at", "local_device_id"]);
        values.push(Value::Text(row.sync_status.as_str().to_string()));
        values.push(Value::Text(format_timestamp(row.local_updated_at)));
        values.push(Value::Text(row.local_device_id.clone()));

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            meta.name,
            names.join(", "),
            placeholders.join(", ")
        );

        conn.execute(&sql, params_from_iter(values))?;
        conn.execute(
            "INSERT OR REPLACE INTO _tabula_sync_state \
             (table_name, record_id, last_synced_version) VALUES (?1, ?2, ?3)",
            params![
                meta.name,
                row.record_id,
                row.last_synced_version.map(|v| v as i64)
            ],
        )?;
        Ok(())
    }

    fn read_rows(
        &self,
        conn: &Connection,
        meta: &TableMeta,
        filter: &str,
        bindings: &[Value],
    ) -> SyncResult<Vec<LocalRow>> {
        let names: Vec<&str> = meta.columns.iter().map(|(n, _)| n.as_str()).collect();
        let sql = format!(
            "SELECT {}, sync_status, local_updated_at, local_device_id FROM {} {}",
            names.join(", "),
            meta.name,
            filter
        );
        let n = meta.columns.len();

        let mut stmt = conn.prepare(&sql)?;
        let raw: Vec<(Vec<Value>, String, String, String)> = stmt
            .query_map(params_from_iter(bindings.iter().cloned()), |row| {
                let mut values = Vec::with_capacity(n);
                for i in 0..n {
                    values.push(row.get::<_, Value>(i)?);
                }
                Ok((
                    values,
                    row.get::<_, String>(n)?,
                    row.get::<_, String>(n + 1)?,
                    row.get::<_, String>(n + 2)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (values, status, updated_at, device_id) in raw {
            rows.push(self.build_row(conn, meta, values, &status, &updated_at, device_id)?);
        }
        Ok(rows)
    }

    fn build_row(
        &self,
        conn: &Connection,
        meta: &TableMeta,
        values: Vec<Value>,
        status: &str,
        updated_at: &str,
        device_id: String,
    ) -> SyncResult<LocalRow> {
        let mut data = serde_json::Map::new();
        let mut record_id = None;
        for ((name, logical), value) in meta.columns.iter().zip(values) {
            if *name == meta.pk {
                record_id = value_to_record_id(&value);
            }
            data.insert(name.clone(), sql_to_json(value, logical));
        }
        let record_id = record_id.ok_or_else(|| {
            SyncError::corrupt(format!("row in `{}` has no usable key", meta.name))
        })?;

        let sync_status = SyncStatus::parse(status)
            .ok_or_else(|| SyncError::corrupt(format!("bad sync_status `{status}`")))?;
        let local_updated_at = parse_ts(updated_at)?;
        let last_synced_version = self.state_version(conn, &meta.name, &record_id)?;

        Ok(LocalRow {
            record_id,
            data: serde_json::Value::Object(data),
            sync_status,
            local_updated_at,
            local_device_id: device_id,
            last_synced_version,
        })
    }

    fn state_version(
        &self,
        conn: &Connection,
        table: &str,
        record_id: &str,
    ) -> SyncResult<Option<u64>> {
        let version: Option<Option<i64>> = conn
            .query_row(
                "SELECT last_synced_version FROM _tabula_sync_state \
                 WHERE table_name = ?1 AND record_id = ?2",
                params![table, record_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.flatten().map(|v| v as u64))
    }
}

impl LocalStore for SqliteReplica {
    fn schema_version(&self) -> SyncResult<Option<SchemaVersion>> {
        let conn = self.conn.lock();
        let raw: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT version, schema_hash, applied_at FROM schema_version \
                 ORDER BY version DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        match raw {
            None => Ok(None),
            Some((version, schema_hash, applied_at)) => Ok(Some(SchemaVersion {
                version: version as u32,
                schema_hash,
                applied_at: parse_ts(&applied_at)?,
            })),
        }
    }

    fn set_schema_version(&self, version: &SchemaVersion) -> SyncResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version, schema_hash, applied_at) \
             VALUES (?1, ?2, ?3)",
            params![
                version.version,
                version.schema_hash,
                format_timestamp(version.applied_at)
            ],
        )?;
        Ok(())
    }

    fn tables(&self) -> SyncResult<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn get_row(&self, table: &str, record_id: &str) -> SyncResult<Option<LocalRow>> {
        let meta = self.table(table)?;
        let conn = self.conn.lock();
        let filter = format!("WHERE {} = ?1", meta.pk);
        let mut rows = self.read_rows(
            &conn,
            meta,
            &filter,
            &[Value::Text(record_id.to_string())],
        )?;
        Ok(rows.pop())
    }

    fn pending_rows(&self, table: &str, limit: usize) -> SyncResult<Vec<LocalRow>> {
        let meta = self.table(table)?;
        let conn = self.conn.lock();
        let filter = format!(
            "WHERE sync_status = 'pending' ORDER BY local_updated_at ASC, {} ASC LIMIT ?1",
            meta.pk
        );
        self.read_rows(&conn, meta, &filter, &[Value::Integer(limit as i64)])
    }

    fn put_local(&self, table: &str, row: &LocalRow) -> SyncResult<()> {
        let meta = self.table(table)?;
        self.write_row(meta, row)
    }

    fn overwrite_from_remote(&self, record: &CanonicalRecord, device_id: &str) -> SyncResult<()> {
        let meta = self.table(&record.table)?;
        let row = LocalRow::synced(
            record.record_id.clone(),
            record.data.clone(),
            device_id,
            record.version,
        );
        self.write_row(meta, &row)
    }

    fn mark_synced(&self, table: &str, record_id: &str, version: u64) -> SyncResult<()> {
        let meta = self.table(table)?;
        let conn = self.conn.lock();
        let sql = format!(
            "UPDATE {} SET sync_status = 'synced' WHERE {} = ?1",
            meta.name, meta.pk
        );
        conn.execute(&sql, params![record_id])?;
        conn.execute(
            "INSERT OR REPLACE INTO _tabula_sync_state \
             (table_name, record_id, last_synced_version) VALUES (?1, ?2, ?3)",
            params![meta.name, record_id, version as i64],
        )?;
        Ok(())
    }

    fn mark_conflict(&self, table: &str, record_id: &str) -> SyncResult<()> {
        let meta = self.table(table)?;
        let conn = self.conn.lock();
        let sql = format!(
            "UPDATE {} SET sync_status = 'conflict' WHERE {} = ?1",
            meta.name, meta.pk
        );
        conn.execute(&sql, params![record_id])?;
        Ok(())
    }

    fn download_cursor(&self) -> SyncResult<u64> {
        let conn = self.conn.lock();
        let sequence: i64 =
            conn.query_row("SELECT sequence FROM _tabula_cursor WHERE id = 1", [], |row| {
                row.get(0)
            })?;
        Ok(sequence as u64)
    }

    fn set_download_cursor(&self, sequence: u64) -> SyncResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE _tabula_cursor SET sequence = ?1 WHERE id = 1",
            params![sequence as i64],
        )?;
        Ok(())
    }
}

impl MetadataStore for SqliteReplica {
    fn create_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sync_operations \
             (id, tenant_id, operation_type, status, started_at, completed_at, \
              records_count, error_message, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                operation.id.to_string(),
                operation.tenant_id,
                operation.operation_type.as_str(),
                operation.status.as_str(),
                format_timestamp(operation.started_at),
                operation.completed_at.map(format_timestamp),
                operation.records_count as i64,
                operation.error_message,
                operation.metadata.as_ref().map(|m| m.to_string()),
            ],
        )?;
        Ok(())
    }

    fn update_operation(&self, operation: &SyncOperationRecord) -> SyncResult<()> {
        let current = self
            .get_operation(operation.id)?
            .ok_or(SyncError::OperationNotFound(operation.id))?;
        check_transition(current.status, operation.status)?;

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sync_operations SET status = ?2, completed_at = ?3, records_count = ?4, \
             error_message = ?5, metadata = ?6 WHERE id = ?1",
            params![
                operation.id.to_string(),
                operation.status.as_str(),
                operation.completed_at.map(format_timestamp),
                operation.records_count as i64,
                operation.error_message,
                operation.metadata.as_ref().map(|m| m.to_string()),
            ],
        )?;
        Ok(())
    }

    fn get_operation(&self, id: Uuid) -> SyncResult<Option<SyncOperationRecord>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT id, tenant_id, operation_type, status, started_at, completed_at, \
                 records_count, error_message, metadata FROM sync_operations WHERE id = ?1",
                params![id.to_string()],
                read_operation,
            )
            .optional()?;
        raw.map(parse_operation).transpose()
    }

    fn running_operation(&self, tenant_id: &str) -> SyncResult<Option<SyncOperationRecord>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT id, tenant_id, operation_type, status, started_at, completed_at, \
                 records_count, error_message, metadata FROM sync_operations \
                 WHERE tenant_id = ?1 AND status = 'RUNNING' LIMIT 1",
                params![tenant_id],
                read_operation,
            )
            .optional()?;
        raw.map(parse_operation).transpose()
    }

    fn insert_conflict(&self, conflict: &SyncConflict) -> SyncResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sync_conflicts \
             (id, tenant_id, operation_id, table_name, record_id, local_data, remote_data, \
              resolution, resolved_by, resolved_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                conflict.id.to_string(),
                conflict.tenant_id,
                conflict.operation_id.to_string(),
                conflict.table_name,
                conflict.record_id,
                conflict.local_data.to_string(),
                conflict.remote_data.to_string(),
                conflict.resolution.map(|r| r.as_str()),
                conflict.resolved_by,
                conflict.resolved_at.map(format_timestamp),
                format_timestamp(conflict.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_conflict(&self, id: Uuid) -> SyncResult<Option<SyncConflict>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &conflict_select("WHERE id = ?1"),
                params![id.to_string()],
                read_conflict,
            )
            .optional()?;
        raw.map(parse_conflict).transpose()
    }

    fn unresolved_conflict(
        &self,
        table: &str,
        record_id: &str,
    ) -> SyncResult<Option<SyncConflict>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &conflict_select(
                    "WHERE table_name = ?1 AND record_id = ?2 AND resolution IS NULL LIMIT 1",
                ),
                params![table, record_id],
                read_conflict,
            )
            .optional()?;
        raw.map(parse_conflict).transpose()
    }

    fn pending_conflicts(&self, tenant_id: &str) -> SyncResult<Vec<SyncConflict>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&conflict_select(
            "WHERE tenant_id = ?1 AND resolution IS NULL ORDER BY created_at ASC",
        ))?;
        let raw: Vec<RawConflict> = stmt
            .query_map(params![tenant_id], read_conflict)?
            .collect::<rusqlite::Result<_>>()?;
        raw.into_iter().map(parse_conflict).collect()
    }

    fn record_resolution(&self, conflict: &SyncConflict) -> SyncResult<()> {
        let current = self
            .get_conflict(conflict.id)?
            .ok_or(SyncError::ConflictNotFound(conflict.id))?;
        if current.is_resolved() {
            return Err(SyncError::ConflictAlreadyResolved(conflict.id));
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sync_conflicts SET resolution = ?2, resolved_by = ?3, resolved_at = ?4 \
             WHERE id = ?1",
            params![
                conflict.id.to_string(),
                conflict.resolution.map(|r| r.as_str()),
                conflict.resolved_by,
                conflict.resolved_at.map(format_timestamp),
            ],
        )?;
        Ok(())
    }

    fn append_log(&self, entry: &SyncLogEntry) -> SyncResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sync_logs (id, tenant_id, operation_id, level, message, details, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.tenant_id,
                entry.operation_id.map(|id| id.to_string()),
                entry.level.as_str(),
                entry.message,
                entry.details.as_ref().map(|d| d.to_string()),
                format_timestamp(entry.created_at),
            ],
        )?;
        Ok(())
    }
}

type RawOperation = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
    Option<String>,
);

fn read_operation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawOperation> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn parse_operation(raw: RawOperation) -> SyncResult<SyncOperationRecord> {
    let (id, tenant_id, op_type, status, started, completed, count, error, metadata) = raw;
    Ok(SyncOperationRecord {
        id: parse_uuid(&id)?,
        tenant_id,
        operation_type: OperationType::parse(&op_type)
            .ok_or_else(|| SyncError::corrupt(format!("bad operation_type `{op_type}`")))?,
        status: OperationStatus::parse(&status)
            .ok_or_else(|| SyncError::corrupt(format!("bad operation status `{status}`")))?,
        started_at: parse_ts(&started)?,
        completed_at: completed.as_deref().map(parse_ts).transpose()?,
        records_count: count as u64,
        error_message: error,
        metadata: metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
    })
}

type RawConflict = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn conflict_select(filter: &str) -> String {
    format!(
        "SELECT id, tenant_id, operation_id, table_name, record_id, local_data, remote_data, \
         resolution, resolved_by, resolved_at, created_at FROM sync_conflicts {filter}"
    )
}

fn read_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConflict> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn parse_conflict(raw: RawConflict) -> SyncResult<SyncConflict> {
    let (id, tenant, op, table, record, local, remote, resolution, by, at, created) = raw;
    Ok(SyncConflict {
        id: parse_uuid(&id)?,
        tenant_id: tenant,
        operation_id: parse_uuid(&op)?,
        table_name: table,
        record_id: record,
        local_data: serde_json::from_str(&local)?,
        remote_data: serde_json::from_str(&remote)?,
        resolution: resolution
            .as_deref()
            .map(|r| {
                Resolution::parse(r)
                    .ok_or_else(|| SyncError::corrupt(format!("bad resolution `{r}`")))
            })
            .transpose()?,
        resolved_by: by,
        resolved_at: at.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created)?,
    })
}

fn parse_uuid(s: &str) -> SyncResult<Uuid> {
    Uuid::parse_str(s).map_err(|_| SyncError::corrupt(format!("bad uuid `{s}`")))
}

fn parse_ts(s: &str) -> SyncResult<DateTime<Utc>> {
    parse_timestamp(s).ok_or_else(|| SyncError::corrupt(format!("bad timestamp `{s}`")))
}

fn value_to_record_id(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn json_to_sql(value: &serde_json::Value, logical: &LogicalType) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => {
            if matches!(logical, LogicalType::Binary) {
                match hex::decode(s) {
                    Ok(bytes) => Value::Blob(bytes),
                    Err(_) => Value::Text(s.clone()),
                }
            } else {
                Value::Text(s.clone())
            }
        }
        other => Value::Text(other.to_string()),
    }
}

fn sql_to_json(value: Value, logical: &LogicalType) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => {
            if matches!(logical, LogicalType::Boolean) {
                serde_json::Value::Bool(i != 0)
            } else {
                serde_json::Value::Number(i.into())
            }
        }
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(t) => {
            if matches!(logical, LogicalType::Json | LogicalType::Array) {
                serde_json::from_str(&t).unwrap_or(serde_json::Value::String(t))
            } else {
                serde_json::Value::String(t)
            }
        }
        Value::Blob(b) => serde_json::Value::String(hex::encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_meta::LogLevel;
    use tabula_schema::{generate, load_schema};

    const SCHEMA: &str = r#"
        table students {
          id     uuid    @id
          name   text
          gpa    float?
          active boolean @default(true)
          tags   json    @default("[]")
        }
    "#;

    fn replica() -> SqliteReplica {
        let schema = load_schema(SCHEMA).unwrap();
        let generated = generate(&schema).unwrap();
        SqliteReplica::provision(
            Connection::open_in_memory().unwrap(),
            &schema,
            &generated.ddl,
            SchemaVersion::new(1, generated.hash),
        )
        .unwrap()
    }

    #[test]
    fn composite_primary_key_is_rejected() {
        let schema = load_schema(
            "table note_tags {\n  note_id uuid @id\n  tag_id uuid @id\n}",
        )
        .unwrap();
        let generated = generate(&schema).unwrap();
        let err = SqliteReplica::provision(
            Connection::open_in_memory().unwrap(),
            &schema,
            &generated.ddl,
            SchemaVersion::new(1, generated.hash),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Corrupt { .. }));
        assert!(err.to_string().contains("note_tags"));
    }

    #[test]
    fn provision_records_the_schema_version() {
        let replica = replica();
        let version = replica.schema_version().unwrap().unwrap();
        assert_eq!(version.version, 1);
        assert_eq!(version.schema_hash.len(), 64);
        assert_eq!(replica.tables().unwrap(), vec!["students".to_string()]);
    }

    #[test]
    fn row_roundtrip_preserves_types() {
        let replica = replica();
        let data = json!({
            "id": "s-1",
            "name": "Ada",
            "gpa": 3.5,
            "active": true,
            "tags": ["math", "cs"],
        });
        let row = LocalRow::pending("s-1", data.clone(), "device-a");
        replica.put_local("students", &row).unwrap();

        let loaded = replica.get_row("students", "s-1").unwrap().unwrap();
        assert_eq!(loaded.record_id, "s-1");
        assert_eq!(loaded.data, data);
        assert!(loaded.is_pending());
        assert_eq!(loaded.last_synced_version, None);
    }

    #[test]
    fn pending_rows_are_ordered_and_limited() {
        let replica = replica();
        for (id, offset) in [("s-2", 20), ("s-1", 10), ("s-3", 30)] {
            let mut row = LocalRow::pending(id, json!({"id": id, "name": id}), "device-a");
            row.local_updated_at += chrono::Duration::seconds(offset);
            replica.put_local("students", &row).unwrap();
        }

        let rows = replica.pending_rows("students", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record_id, "s-1");
        assert_eq!(rows[1].record_id, "s-2");
    }

    #[test]
    fn mark_synced_clears_pending_and_records_the_version() {
        let replica = replica();
        let row = LocalRow::pending("s-1", json!({"id": "s-1", "name": "Ada"}), "device-a");
        replica.put_local("students", &row).unwrap();
        replica.mark_synced("students", "s-1", 4).unwrap();

        let loaded = replica.get_row("students", "s-1").unwrap().unwrap();
        assert_eq!(loaded.sync_status, SyncStatus::Synced);
        assert_eq!(loaded.last_synced_version, Some(4));
        assert!(replica.pending_rows("students", 10).unwrap().is_empty());
    }

    #[test]
    fn overwrite_from_remote_marks_synced() {
        let replica = replica();
        let row = LocalRow::pending("s-1", json!({"id": "s-1", "name": "Ada"}), "device-a");
        replica.put_local("students", &row).unwrap();

        let record = CanonicalRecord::new(
            "students",
            "s-1",
            json!({"id": "s-1", "name": "Grace"}),
            7,
            "device-b",
            42,
        );
        replica.overwrite_from_remote(&record, "device-a").unwrap();

        let loaded = replica.get_row("students", "s-1").unwrap().unwrap();
        assert_eq!(loaded.data["name"], "Grace");
        assert_eq!(loaded.sync_status, SyncStatus::Synced);
        assert_eq!(loaded.last_synced_version, Some(7));
    }

    #[test]
    fn cursor_starts_at_zero_and_advances() {
        let replica = replica();
        assert_eq!(replica.download_cursor().unwrap(), 0);
        replica.set_download_cursor(17).unwrap();
        assert_eq!(replica.download_cursor().unwrap(), 17);
    }

    #[test]
    fn operation_journal_roundtrip() {
        let replica = replica();
        let mut op = SyncOperationRecord::begin("tenant-1", OperationType::FullSync);
        replica.create_operation(&op).unwrap();

        op.status = OperationStatus::Running;
        replica.update_operation(&op).unwrap();
        assert_eq!(
            replica.running_operation("tenant-1").unwrap().unwrap().id,
            op.id
        );

        op.status = OperationStatus::Succeeded;
        op.completed_at = Some(Utc::now());
        op.records_count = 12;
        replica.update_operation(&op).unwrap();

        let loaded = replica.get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Succeeded);
        assert_eq!(loaded.records_count, 12);
        assert!(replica.running_operation("tenant-1").unwrap().is_none());
    }

    #[test]
    fn illegal_operation_transition_is_rejected() {
        let replica = replica();
        let mut op = SyncOperationRecord::begin("tenant-1", OperationType::Upload);
        replica.create_operation(&op).unwrap();

        op.status = OperationStatus::Failed;
        assert!(matches!(
            replica.update_operation(&op),
            Err(SyncError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn conflict_journal_and_resolution() {
        let replica = replica();
        let op = SyncOperationRecord::begin("tenant-1", OperationType::Upload);
        replica.create_operation(&op).unwrap();

        let mut conflict = SyncConflict::detected(
            "tenant-1",
            op.id,
            "students",
            "s-1",
            json!({"name": "Ada"}),
            json!({"name": "Grace"}),
        );
        replica.insert_conflict(&conflict).unwrap();

        assert!(replica
            .unresolved_conflict("students", "s-1")
            .unwrap()
            .is_some());
        assert_eq!(replica.pending_conflicts("tenant-1").unwrap().len(), 1);

        conflict.resolution = Some(Resolution::Remote);
        conflict.resolved_by = Some("operator".into());
        conflict.resolved_at = Some(Utc::now());
        replica.record_resolution(&conflict).unwrap();

        assert!(replica
            .unresolved_conflict("students", "s-1")
            .unwrap()
            .is_none());
        assert!(matches!(
            replica.record_resolution(&conflict),
            Err(SyncError::ConflictAlreadyResolved(_))
        ));

        let loaded = replica.get_conflict(conflict.id).unwrap().unwrap();
        assert_eq!(loaded.resolution, Some(Resolution::Remote));
        assert_eq!(loaded.local_data, json!({"name": "Ada"}));
    }

    #[test]
    fn log_entries_are_appended() {
        let replica = replica();
        let entry = SyncLogEntry::new("tenant-1", None, LogLevel::Info, "provisioned")
            .with_details(json!({"tables": 1}));
        replica.append_log(&entry).unwrap();

        let conn = replica.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sync_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
