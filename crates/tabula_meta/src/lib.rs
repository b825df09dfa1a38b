//! # Tabula Meta
//!
//! Sync metadata model shared by the schema generator and the sync engine.
//!
//! This crate provides:
//! - Closed enumerations for row and operation lifecycle states
//! - Record types for the bookkeeping tables (`sync_operations`,
//!   `sync_conflicts`, `sync_logs`, `schema_version`)
//! - Row snapshot types exchanged between a local replica and the
//!   canonical store
//! - The bookkeeping DDL provisioned on every device

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ddl;
mod records;
mod row;
mod status;
mod time;

pub use ddl::bookkeeping_ddl;
pub use records::{SchemaVersion, SyncConflict, SyncLogEntry, SyncOperationRecord};
pub use row::{CanonicalRecord, LocalRow};
pub use status::{LogLevel, OperationStatus, OperationType, Resolution, SyncStatus};
pub use time::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
