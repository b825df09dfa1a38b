//! Mirror DDL generation and schema hashing.
//!
//! Output is byte-stable for a given model: tables are emitted in load
//! order, columns in canonical order with the three sync columns appended
//! last, and the artifact ends with the bookkeeping tables. `schema_hash`
//! digests the full emitted text, so two devices agree on compatibility
//! exactly when their DDL is byte-identical.

use crate::error::SchemaResult;
use crate::mapper::{map_column, MirrorColumn, PhysicalType};
use crate::model::{CanonicalSchema, CanonicalTable};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// The generated mirror schema artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSchema {
    /// Full DDL text: business tables, indexes, bookkeeping tables.
    pub ddl: String,
    /// Lowercase hex SHA-256 digest of `ddl`.
    pub hash: String,
}

/// Generates the mirror DDL and its content hash for a loaded schema.
pub fn generate(schema: &CanonicalSchema) -> SchemaResult<GeneratedSchema> {
    let mut ddl = String::from("-- Generated mirror schema; do not edit by hand.\n\n");

    for table in &schema.tables {
        emit_table(&mut ddl, table)?;
    }

    ddl.push_str(tabula_meta::bookkeeping_ddl());

    let hash = schema_hash(&ddl);
    Ok(GeneratedSchema { ddl, hash })
}

/// Computes the lowercase hex SHA-256 digest of a DDL text.
pub fn schema_hash(ddl: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ddl.as_bytes());
    hex::encode(hasher.finalize())
}

fn emit_table(out: &mut String, table: &CanonicalTable) -> SchemaResult<()> {
    let mapped: Vec<MirrorColumn> = table
        .columns
        .iter()
        .map(|c| map_column(&table.name, c))
        .collect::<SchemaResult<_>>()?;

    let pk: Vec<&MirrorColumn> = mapped.iter().filter(|c| c.primary_key).collect();
    let inline_pk = pk.len() == 1;

    let _ = writeln!(out, "CREATE TABLE {} (", table.name);

    let mut lines: Vec<String> = mapped
        .iter()
        .map(|column| column_line(column, inline_pk))
        .collect();

    // The three sync columns every mirrored table carries, appended last.
    lines.push("    sync_status TEXT NOT NULL DEFAULT 'pending'".to_string());
    lines.push("    local_updated_at TEXT NOT NULL".to_string());
    lines.push("    local_device_id TEXT NOT NULL".to_string());

    if !inline_pk && !pk.is_empty() {
        let names: Vec<&str> = pk.iter().map(|c| c.name.as_str()).collect();
        lines.push(format!("    PRIMARY KEY ({})", names.join(", ")));
    }

    out.push_str(&lines.join(",\n"));
    out.push_str("\n);\n");

    for index in &table.indexes {
        let suffix = index.columns.join("_");
        let _ = writeln!(
            out,
            "CREATE INDEX idx_{}_{} ON {}({});",
            table.name,
            suffix,
            table.name,
            index.columns.join(", ")
        );
    }

    // The coordinator filters by these two columns on every cycle; they
    // must never be a full-table scan.
    let _ = writeln!(
        out,
        "CREATE INDEX idx_{0}_sync_status ON {0}(sync_status);",
        table.name
    );
    let _ = writeln!(
        out,
        "CREATE INDEX idx_{0}_local_updated_at ON {0}(local_updated_at);",
        table.name
    );
    out.push('\n');

    Ok(())
}

fn column_line(column: &MirrorColumn, inline_pk: bool) -> String {
    let mut line = format!("    {} {}", column.name, column.physical.as_sql());

    if column.primary_key && inline_pk {
        line.push_str(" PRIMARY KEY");
        if column.auto_increment && column.physical == PhysicalType::Integer {
            line.push_str(" AUTOINCREMENT");
        }
    } else {
        if column.not_null {
            line.push_str(" NOT NULL");
        }
        if column.unique {
            line.push_str(" UNIQUE");
        }
    }

    if let Some(default) = &column.default_sql {
        let _ = write!(line, " DEFAULT {default}");
    }

    if let Some(target) = &column.references {
        let _ = write!(line, " REFERENCES {}({})", target.table, target.column);
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_schema;

    const FIXTURE: &str = r#"
        table schools {
          id   uuid @id @default(uuid())
          name text @unique
        }

        table students {
          id         uuid      @id @default(uuid())
          first_name text
          gpa        decimal(5,2)
          active     boolean   @default(false)
          tags       json      @default("[]")
          created_at timestamp @default(now())
          school_id  uuid      @references(schools.id)

          @index(school_id)
        }
    "#;

    fn generated() -> GeneratedSchema {
        generate(&load_schema(FIXTURE).unwrap()).unwrap()
    }

    #[test]
    fn generation_is_deterministic() {
        let first = generated();
        let second = generated();
        assert_eq!(first.ddl, second.ddl);
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.hash.len(), 64);
    }

    #[test]
    fn hash_changes_with_table_order() {
        let reordered = r#"
            table students {
              id uuid @id
            }
            table schools {
              id uuid @id
            }
        "#;
        let original = r#"
            table schools {
              id uuid @id
            }
            table students {
              id uuid @id
            }
        "#;
        let a = generate(&load_schema(original).unwrap()).unwrap();
        let b = generate(&load_schema(reordered).unwrap()).unwrap();
        assert_ne!(a.ddl, b.ddl);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn whitespace_does_not_change_the_hash() {
        let compact = "table a { id uuid @id }";
        let airy = "table a {\n\n  id   uuid   @id\n\n}\n# trailing comment\n";
        let a = generate(&load_schema(compact).unwrap()).unwrap();
        let b = generate(&load_schema(airy).unwrap()).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn every_table_carries_the_sync_columns() {
        let ddl = generated().ddl;
        for table in ["schools", "students"] {
            let start = ddl.find(&format!("CREATE TABLE {table} (")).unwrap();
            let end = ddl[start..].find(");").unwrap() + start;
            let body = &ddl[start..end];
            assert!(body.contains("sync_status TEXT NOT NULL DEFAULT 'pending'"));
            assert!(body.contains("local_updated_at TEXT NOT NULL"));
            assert!(body.contains("local_device_id TEXT NOT NULL"));
        }
    }

    #[test]
    fn sync_columns_are_indexed_per_table() {
        let ddl = generated().ddl;
        assert!(ddl.contains("CREATE INDEX idx_students_sync_status ON students(sync_status);"));
        assert!(ddl
            .contains("CREATE INDEX idx_students_local_updated_at ON students(local_updated_at);"));
        assert!(ddl.contains("CREATE INDEX idx_schools_sync_status ON schools(sync_status);"));
    }

    #[test]
    fn declared_indexes_are_emitted() {
        let ddl = generated().ddl;
        assert!(ddl.contains("CREATE INDEX idx_students_school_id ON students(school_id);"));
    }

    #[test]
    fn primary_key_mapping() {
        let ddl = generated().ddl;
        assert!(ddl.contains("id TEXT PRIMARY KEY"));

        let auto = generate(&load_schema("table counters { seq integer @id(auto) }").unwrap())
            .unwrap()
            .ddl;
        assert!(auto.contains("seq INTEGER PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn composite_key_becomes_table_constraint() {
        let schema = load_schema(
            "table note_tags { note_id uuid @id @references(notes.id)\ntag_id uuid @id }\n\
             table notes { id uuid @id }",
        )
        .unwrap();
        let ddl = generate(&schema).unwrap().ddl;
        assert!(ddl.contains("PRIMARY KEY (note_id, tag_id)"));
        assert!(ddl.contains("note_id TEXT NOT NULL REFERENCES notes(id)"));
    }

    #[test]
    fn bookkeeping_tables_are_appended() {
        let ddl = generated().ddl;
        assert!(ddl.contains("CREATE TABLE sync_operations ("));
        assert!(ddl.contains("CREATE TABLE schema_version ("));
    }

    #[test]
    fn unmapped_type_aborts_generation() {
        let schema = load_schema("table a { id uuid @id\ngeo geometry }").unwrap();
        assert!(generate(&schema).is_err());
    }
}
