//! Lifecycle enumerations.
//!
//! Every state that sync logic branches on is a closed enum so that
//! match arms stay exhaustive. The `as_str`/`parse` pairs define the
//! exact TEXT representation stored in the bookkeeping tables.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a mirrored row on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Row has an unsynchronized local mutation.
    Pending,
    /// Row matches what the canonical store last confirmed.
    Synced,
    /// Row diverged and holds an unresolved conflict.
    Conflict,
}

impl SyncStatus {
    /// Returns the stored TEXT form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
        }
    }

    /// Parses the stored TEXT form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncStatus::Pending),
            "synced" => Some(SyncStatus::Synced),
            "conflict" => Some(SyncStatus::Conflict),
            _ => None,
        }
    }
}

/// Type of a sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Push pending local rows to the canonical store.
    Upload,
    /// Apply canonical changes to the local replica.
    Download,
    /// Upload to completion, then download, in one operation.
    FullSync,
}

impl OperationType {
    /// Returns the stored TEXT form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Upload => "UPLOAD",
            OperationType::Download => "DOWNLOAD",
            OperationType::FullSync => "FULL_SYNC",
        }
    }

    /// Parses the stored TEXT form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPLOAD" => Some(OperationType::Upload),
            "DOWNLOAD" => Some(OperationType::Download),
            "FULL_SYNC" => Some(OperationType::FullSync),
            _ => None,
        }
    }
}

/// Status of a sync operation record.
///
/// Transitions are monotonic: `Pending` → `Running` → terminal.
/// A terminal operation is never resurrected; a retry creates a new
/// operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Created, not yet started.
    Pending,
    /// Cycle is in progress.
    Running,
    /// Terminal: completed without a fatal error.
    Succeeded,
    /// Terminal: aborted with `error_message` populated.
    Failed,
}

impl OperationStatus {
    /// Returns the stored TEXT form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::Running => "RUNNING",
            OperationStatus::Succeeded => "SUCCEEDED",
            OperationStatus::Failed => "FAILED",
        }
    }

    /// Parses the stored TEXT form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OperationStatus::Pending),
            "RUNNING" => Some(OperationStatus::Running),
            "SUCCEEDED" => Some(OperationStatus::Succeeded),
            "FAILED" => Some(OperationStatus::Failed),
            _ => None,
        }
    }

    /// Returns true once the operation can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }

    /// Returns true if `next` is a legal successor state.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        matches!(
            (self, next),
            (OperationStatus::Pending, OperationStatus::Running)
                | (OperationStatus::Running, OperationStatus::Succeeded)
                | (OperationStatus::Running, OperationStatus::Failed)
        )
    }
}

/// Resolution recorded for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    /// The local version wins and is re-applied to the canonical store.
    Local,
    /// The remote version wins and overwrites the local row.
    Remote,
    /// An external actor reconciled the record out of band.
    Manual,
}

impl Resolution {
    /// Returns the stored TEXT form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Local => "LOCAL",
            Resolution::Remote => "REMOTE",
            Resolution::Manual => "MANUAL",
        }
    }

    /// Parses the stored TEXT form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOCAL" => Some(Resolution::Local),
            "REMOTE" => Some(Resolution::Remote),
            "MANUAL" => Some(Resolution::Manual),
            _ => None,
        }
    }
}

/// Severity of a sync log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Normal progress.
    Info,
    /// Recoverable anomaly (conflict detected, log sink hiccup).
    Warning,
    /// Fatal for the enclosing operation.
    Error,
}

impl LogLevel {
    /// Returns the stored TEXT form.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Parses the stored TEXT form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INFO" => Some(LogLevel::Info),
            "WARNING" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_text_roundtrip() {
        for status in [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Conflict] {
            assert_eq!(SyncStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SyncStatus::parse("PENDING"), None);
    }

    #[test]
    fn operation_type_text_roundtrip() {
        for op in [
            OperationType::Upload,
            OperationType::Download,
            OperationType::FullSync,
        ] {
            assert_eq!(OperationType::parse(op.as_str()), Some(op));
        }
        assert_eq!(OperationType::parse("full_sync"), None);
    }

    #[test]
    fn operation_status_transitions() {
        use OperationStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Succeeded));
        assert!(Running.can_transition_to(Failed));

        // Terminal states never move again.
        assert!(!Succeeded.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Pending.can_transition_to(Succeeded));

        assert!(Succeeded.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Running.is_terminal());
    }

    #[test]
    fn resolution_and_level_parse() {
        assert_eq!(Resolution::parse("LOCAL"), Some(Resolution::Local));
        assert_eq!(Resolution::parse("MERGE"), None);
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warning));
    }
}
