//! Typed canonical schema model.
//!
//! Immutable once loaded for a given schema revision. Tables and columns
//! keep their declaration order, which the generator relies on for
//! byte-stable output.

use serde::{Deserialize, Serialize};

/// An ordered list of canonical tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    /// Tables in declaration order.
    pub tables: Vec<CanonicalTable>,
}

impl CanonicalSchema {
    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&CanonicalTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// One canonical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTable {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<CanonicalColumn>,
    /// Declared secondary indexes.
    pub indexes: Vec<IndexDef>,
}

impl CanonicalTable {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&CanonicalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary-key columns in declaration order.
    pub fn primary_key(&self) -> Vec<&CanonicalColumn> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }
}

/// One canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalColumn {
    /// Column name.
    pub name: String,
    /// Logical type as declared.
    pub logical_type: LogicalType,
    /// True if the column admits NULL.
    pub nullable: bool,
    /// Declared default expression.
    pub default: Option<DefaultValue>,
    /// True if the column carries a uniqueness constraint.
    pub unique: bool,
    /// True if the column is part of the primary key.
    pub primary_key: bool,
    /// True if the key uses auto-increment integer semantics.
    pub auto_increment: bool,
    /// Foreign-key target, if declared.
    pub references: Option<ColumnRef>,
}

/// A `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Target table.
    pub table: String,
    /// Target column.
    pub column: String,
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// A declared secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Indexed columns in order.
    pub columns: Vec<String>,
}

/// Canonical logical column types.
///
/// Unknown type names parse into `Other` so the mapper, not the parser,
/// decides they have no mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
    /// Text-like (text, varchar, string).
    Text,
    /// Externally generated identifier.
    Uuid,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Floating point.
    Float,
    /// Fixed-point decimal. Precision is not preserved locally.
    Decimal,
    /// Boolean.
    Boolean,
    /// Point in time.
    Timestamp,
    /// Calendar date.
    Date,
    /// Nested JSON document.
    Json,
    /// Collection of values.
    Array,
    /// Raw bytes.
    Binary,
    /// A type name with no known logical meaning.
    Other(String),
}

impl LogicalType {
    /// Resolves a declared type name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "text" | "varchar" | "string" => LogicalType::Text,
            "uuid" => LogicalType::Uuid,
            "integer" | "int" => LogicalType::Integer,
            "bigint" => LogicalType::BigInt,
            "float" | "double" | "real" => LogicalType::Float,
            "decimal" | "numeric" => LogicalType::Decimal,
            "boolean" | "bool" => LogicalType::Boolean,
            "timestamp" | "datetime" => LogicalType::Timestamp,
            "date" => LogicalType::Date,
            "json" | "jsonb" => LogicalType::Json,
            "array" => LogicalType::Array,
            "binary" | "bytes" | "blob" => LogicalType::Binary,
            other => LogicalType::Other(other.to_string()),
        }
    }

    /// Returns the canonical name for diagnostics.
    pub fn name(&self) -> &str {
        match self {
            LogicalType::Text => "text",
            LogicalType::Uuid => "uuid",
            LogicalType::Integer => "integer",
            LogicalType::BigInt => "bigint",
            LogicalType::Float => "float",
            LogicalType::Decimal => "decimal",
            LogicalType::Boolean => "boolean",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Date => "date",
            LogicalType::Json => "json",
            LogicalType::Array => "array",
            LogicalType::Binary => "binary",
            LogicalType::Other(name) => name,
        }
    }
}

/// A declared default expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// `uuid()`, a unique identifier generated on insert.
    ///
    /// Dropped from the local DDL; the application generates identifiers
    /// before local insert.
    GeneratedUuid,
    /// `now()`, the current timestamp at insert time.
    CurrentTimestamp,
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal, kept verbatim.
    Number(String),
    /// String literal.
    Text(String),
    /// Empty JSON array.
    EmptyArray,
    /// Empty JSON object.
    EmptyObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_type_resolution() {
        assert_eq!(LogicalType::from_name("varchar"), LogicalType::Text);
        assert_eq!(LogicalType::from_name("jsonb"), LogicalType::Json);
        assert_eq!(LogicalType::from_name("bigint"), LogicalType::BigInt);
        assert_eq!(
            LogicalType::from_name("geometry"),
            LogicalType::Other("geometry".into())
        );
    }

    #[test]
    fn column_ref_display() {
        let r = ColumnRef {
            table: "schools".into(),
            column: "id".into(),
        };
        assert_eq!(r.to_string(), "schools.id");
    }
}
