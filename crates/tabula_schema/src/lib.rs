//! # Tabula Schema
//!
//! Design-time side of the engine: parses a canonical schema document into
//! a typed model, maps canonical column types to local SQLite types, and
//! emits the mirror DDL together with its content hash.
//!
//! The pipeline is `load_schema` → `map_column` (per column, inside the
//! generator) → `generate`. All schema-dialect knowledge lives behind the
//! loader; the mapper and generator never see raw text.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod generator;
mod lexer;
mod mapper;
mod model;
mod parser;

pub use error::{SchemaError, SchemaResult};
pub use generator::{generate, schema_hash, GeneratedSchema};
pub use mapper::{map_column, MirrorColumn, PhysicalType};
pub use model::{
    CanonicalColumn, CanonicalSchema, CanonicalTable, ColumnRef, DefaultValue, IndexDef,
    LogicalType,
};

/// Parses and validates a canonical schema document.
///
/// Identical input text always yields an identical ordered model, so the
/// downstream DDL and hash are reproducible across machines and runs.
pub fn load_schema(input: &str) -> SchemaResult<CanonicalSchema> {
    let tokens = lexer::tokenize(input)?;
    parser::parse(tokens)
}
