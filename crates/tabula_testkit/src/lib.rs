//! # Tabula Testkit
//!
//! Test utilities for the Tabula workspace.
//!
//! This crate provides:
//! - The fixture schema every suite exercises
//! - An in-memory sync deployment ([`SyncHarness`])
//! - A provisioned SQLite replica helper
//!
//! ## Usage
//!
//! ```rust
//! use tabula_testkit::prelude::*;
//! use tabula_meta::OperationType;
//!
//! let harness = SyncHarness::new();
//! harness.seed_local_pending("students", "s-1", student("s-1", "Ada", 3.9));
//! let record = harness.run(OperationType::Upload);
//! assert_eq!(record.records_count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use harness::*;
