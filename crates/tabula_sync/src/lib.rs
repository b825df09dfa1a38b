//! # Tabula Sync
//!
//! The offline-first synchronization engine: a coordinator that drives
//! UPLOAD, DOWNLOAD and FULL_SYNC cycles between a device-local SQLite
//! replica and a canonical store, with optimistic versioning, conflict
//! journaling and an append-only audit log.
//!
//! The coordinator is generic over three seams:
//! - [`LocalStore`], the mirrored business tables on the device
//! - [`CanonicalStore`], the authoritative store (usually remote)
//! - [`MetadataStore`], the bookkeeping tables
//!
//! [`SqliteReplica`] implements the local and bookkeeping seams over one
//! SQLite file; the `memory` module provides in-memory implementations
//! of all three for tests and prototyping.
//!
//! ```
//! use tabula_sync::memory::{MemoryCanonicalStore, MemoryLocalStore, MemoryMetadataStore};
//! use tabula_sync::{SyncConfig, SyncCoordinator};
//! use tabula_meta::{LocalRow, OperationType, SchemaVersion};
//! use tabula_sync::store::LocalStore;
//!
//! let local = MemoryLocalStore::new(&["students"]);
//! local.set_schema_version(&SchemaVersion::new(1, "hash")).unwrap();
//! local
//!     .put_local(
//!         "students",
//!         &LocalRow::pending("s-1", serde_json::json!({"name": "Ada"}), "device-a"),
//!     )
//!     .unwrap();
//!
//! let coordinator = SyncCoordinator::new(
//!     "tenant-1",
//!     &local,
//!     MemoryCanonicalStore::new(),
//!     MemoryMetadataStore::new(),
//!     SyncConfig::new("device-a", "hash"),
//! );
//! let operation_id = coordinator.begin_sync(OperationType::Upload).unwrap();
//! let record = coordinator.get_sync_status(operation_id).unwrap();
//! assert_eq!(record.records_count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod conflict;
mod coordinator;
mod error;
mod log;
pub mod memory;
mod sqlite;
pub mod store;

pub use config::{RetryConfig, SyncConfig};
pub use conflict::{is_divergent, ResolutionPolicy};
pub use coordinator::SyncCoordinator;
pub use error::{SyncError, SyncResult};
pub use log::AuditLog;
pub use sqlite::SqliteReplica;
pub use store::{CanonicalStore, LocalStore, MetadataStore};
