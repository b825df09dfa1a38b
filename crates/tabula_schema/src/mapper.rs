//! Canonical-to-local type mapping.
//!
//! Pure functions only; the mapper never sees raw schema text and never
//! touches I/O. Decimal precision is deliberately not preserved locally;
//! exact decimal semantics belong to the canonical store.

use crate::error::{SchemaError, SchemaResult};
use crate::model::{CanonicalColumn, ColumnRef, DefaultValue, LogicalType};

/// SQLite current-timestamp expression in the engine's ISO-8601 profile.
const NOW_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// Physical SQLite column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    /// TEXT affinity.
    Text,
    /// INTEGER affinity.
    Integer,
    /// REAL affinity.
    Real,
    /// BLOB affinity.
    Blob,
}

impl PhysicalType {
    /// Returns the SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            PhysicalType::Text => "TEXT",
            PhysicalType::Integer => "INTEGER",
            PhysicalType::Real => "REAL",
            PhysicalType::Blob => "BLOB",
        }
    }
}

/// A local column derived from a canonical one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorColumn {
    /// Column name, unchanged from the canonical schema.
    pub name: String,
    /// Physical SQLite type.
    pub physical: PhysicalType,
    /// NOT NULL flag.
    pub not_null: bool,
    /// Translated DEFAULT expression.
    ///
    /// `None` covers both "no default declared" and "default dropped"
    /// (e.g. `uuid()`); either way no DEFAULT clause is emitted locally.
    pub default_sql: Option<String>,
    /// True if the column is part of the primary key.
    pub primary_key: bool,
    /// True if the key maps to INTEGER PRIMARY KEY AUTOINCREMENT.
    pub auto_increment: bool,
    /// True if the column carries a UNIQUE constraint.
    pub unique: bool,
    /// Foreign-key target.
    pub references: Option<ColumnRef>,
}

/// Maps one canonical column to its mirror column.
///
/// Fails with [`SchemaError::UnmappedType`] for any type without a rule;
/// unmapped types are a schema-authoring bug, never papered over.
pub fn map_column(table: &str, column: &CanonicalColumn) -> SchemaResult<MirrorColumn> {
    let physical = match &column.logical_type {
        LogicalType::Text | LogicalType::Uuid => PhysicalType::Text,
        LogicalType::Integer | LogicalType::BigInt => PhysicalType::Integer,
        LogicalType::Float | LogicalType::Decimal => PhysicalType::Real,
        LogicalType::Boolean => PhysicalType::Integer,
        LogicalType::Timestamp | LogicalType::Date => PhysicalType::Text,
        LogicalType::Json | LogicalType::Array => PhysicalType::Text,
        LogicalType::Binary => PhysicalType::Blob,
        LogicalType::Other(name) => {
            return Err(SchemaError::UnmappedType {
                table: table.to_string(),
                column: column.name.clone(),
                type_name: name.clone(),
            });
        }
    };

    // Auto-increment only carries over for integer keys; any other key
    // stays PRIMARY KEY without it.
    let auto_increment = column.auto_increment && physical == PhysicalType::Integer;

    Ok(MirrorColumn {
        name: column.name.clone(),
        physical,
        not_null: !column.nullable,
        default_sql: column.default.as_ref().and_then(translate_default),
        primary_key: column.primary_key,
        auto_increment,
        unique: column.unique,
        references: column.references.clone(),
    })
}

/// Translates a canonical default into a local DEFAULT expression.
///
/// Returns `None` for defaults the local engine cannot provide:
/// `uuid()` identifiers must be generated by the application before
/// local insert.
fn translate_default(default: &DefaultValue) -> Option<String> {
    match default {
        DefaultValue::GeneratedUuid => None,
        DefaultValue::CurrentTimestamp => Some(format!("({NOW_EXPR})")),
        DefaultValue::Bool(true) => Some("1".to_string()),
        DefaultValue::Bool(false) => Some("0".to_string()),
        DefaultValue::Number(n) => Some(n.clone()),
        DefaultValue::Text(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        DefaultValue::EmptyArray => Some("'[]'".to_string()),
        DefaultValue::EmptyObject => Some("'{}'".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, logical_type: LogicalType) -> CanonicalColumn {
        CanonicalColumn {
            name: name.into(),
            logical_type,
            nullable: false,
            default: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            references: None,
        }
    }

    #[test]
    fn every_logical_type_maps() {
        let cases = [
            (LogicalType::Text, PhysicalType::Text),
            (LogicalType::Uuid, PhysicalType::Text),
            (LogicalType::Integer, PhysicalType::Integer),
            (LogicalType::BigInt, PhysicalType::Integer),
            (LogicalType::Float, PhysicalType::Real),
            (LogicalType::Decimal, PhysicalType::Real),
            (LogicalType::Boolean, PhysicalType::Integer),
            (LogicalType::Timestamp, PhysicalType::Text),
            (LogicalType::Date, PhysicalType::Text),
            (LogicalType::Json, PhysicalType::Text),
            (LogicalType::Array, PhysicalType::Text),
            (LogicalType::Binary, PhysicalType::Blob),
        ];

        for (logical, physical) in cases {
            let mapped = map_column("t", &column("c", logical)).unwrap();
            assert_eq!(mapped.physical, physical);
            assert!(!mapped.physical.as_sql().is_empty());
        }
    }

    #[test]
    fn unknown_type_fails_loudly() {
        let err = map_column("students", &column("geo", LogicalType::Other("geometry".into())))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnmappedType {
                table: "students".into(),
                column: "geo".into(),
                type_name: "geometry".into(),
            }
        );
    }

    #[test]
    fn boolean_defaults_become_numeric() {
        let mut col = column("active", LogicalType::Boolean);
        col.default = Some(DefaultValue::Bool(true));
        assert_eq!(map_column("t", &col).unwrap().default_sql.unwrap(), "1");

        col.default = Some(DefaultValue::Bool(false));
        assert_eq!(map_column("t", &col).unwrap().default_sql.unwrap(), "0");
    }

    #[test]
    fn uuid_default_is_dropped() {
        let mut col = column("id", LogicalType::Uuid);
        col.default = Some(DefaultValue::GeneratedUuid);
        assert_eq!(map_column("t", &col).unwrap().default_sql, None);
    }

    #[test]
    fn now_default_becomes_strftime() {
        let mut col = column("created_at", LogicalType::Timestamp);
        col.default = Some(DefaultValue::CurrentTimestamp);
        assert_eq!(
            map_column("t", &col).unwrap().default_sql.unwrap(),
            "(strftime('%Y-%m-%dT%H:%M:%fZ','now'))"
        );
    }

    #[test]
    fn empty_collections_become_json_literals() {
        let mut col = column("tags", LogicalType::Array);
        col.default = Some(DefaultValue::EmptyArray);
        assert_eq!(map_column("t", &col).unwrap().default_sql.unwrap(), "'[]'");

        let mut col = column("extra", LogicalType::Json);
        col.default = Some(DefaultValue::EmptyObject);
        assert_eq!(map_column("t", &col).unwrap().default_sql.unwrap(), "'{}'");
    }

    #[test]
    fn text_default_is_escaped() {
        let mut col = column("note", LogicalType::Text);
        col.default = Some(DefaultValue::Text("it's fine".into()));
        assert_eq!(
            map_column("t", &col).unwrap().default_sql.unwrap(),
            "'it''s fine'"
        );
    }

    #[test]
    fn auto_increment_only_for_integers() {
        let mut col = column("seq", LogicalType::Integer);
        col.primary_key = true;
        col.auto_increment = true;
        assert!(map_column("t", &col).unwrap().auto_increment);

        let mut col = column("id", LogicalType::Uuid);
        col.primary_key = true;
        col.auto_increment = true;
        let mapped = map_column("t", &col).unwrap();
        assert!(mapped.primary_key);
        assert!(!mapped.auto_increment);
    }
}
