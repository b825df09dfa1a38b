//! Error types for schema loading and generation.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading a canonical schema or generating
/// the mirror DDL. All of them are fatal for the generation run; no
/// partial artifact is ever written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Malformed schema document.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line of the offending token.
        line: usize,
        /// Description of what was expected.
        message: String,
    },

    /// Two tables share a name.
    #[error("duplicate table `{table}`")]
    DuplicateTable {
        /// The repeated table name.
        table: String,
    },

    /// Two columns in one table share a name.
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn {
        /// Table containing the repeated column.
        table: String,
        /// The repeated column name.
        column: String,
    },

    /// An `@index` names a column the table does not declare.
    #[error("index on table `{table}` names unknown column `{column}`")]
    UnknownIndexColumn {
        /// Table the index belongs to.
        table: String,
        /// The unknown column.
        column: String,
    },

    /// An `@references` target does not resolve to a declared column.
    #[error("column `{table}.{column}` references unknown target `{target}`")]
    UnknownReferenceTarget {
        /// Table of the referencing column.
        table: String,
        /// The referencing column.
        column: String,
        /// The unresolved `table.column` target.
        target: String,
    },

    /// A column uses a type with no mapping rule.
    ///
    /// Unmapped types are a schema-authoring bug; they never silently
    /// default to TEXT.
    #[error("no mapping rule for type `{type_name}` used by `{table}.{column}`")]
    UnmappedType {
        /// Table of the offending column.
        table: String,
        /// The offending column.
        column: String,
        /// The canonical type name with no rule.
        type_name: String,
    },
}

impl SchemaError {
    /// Creates a parse error at the given line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SchemaError::parse(3, "expected `{` after table name");
        assert_eq!(err.to_string(), "parse error at line 3: expected `{` after table name");

        let err = SchemaError::UnmappedType {
            table: "students".into(),
            column: "geo".into(),
            type_name: "geometry".into(),
        };
        assert!(err.to_string().contains("geometry"));
        assert!(err.to_string().contains("students.geo"));
    }
}
