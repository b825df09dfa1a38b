//! Divergence detection and resolution policy.

use tabula_meta::{LocalRow, Resolution};

/// How the coordinator resolves detected conflicts without an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// The local snapshot always wins; it is pushed to the canonical store.
    Local,
    /// The canonical snapshot always wins; it overwrites the local row.
    Remote,
    /// Conflicts stay unresolved until an operator decides.
    Manual,
}

impl ResolutionPolicy {
    /// Returns true if the policy resolves conflicts without an operator.
    pub fn auto_resolves(&self) -> bool {
        !matches!(self, ResolutionPolicy::Manual)
    }

    /// The resolution this policy records when it auto-resolves.
    pub fn as_resolution(&self) -> Resolution {
        match self {
            ResolutionPolicy::Local => Resolution::Local,
            ResolutionPolicy::Remote => Resolution::Remote,
            ResolutionPolicy::Manual => Resolution::Manual,
        }
    }
}

/// Returns true if a local row and an incoming canonical version diverge.
///
/// A row diverges when it carries an unsynchronized local mutation and the
/// canonical version is not the one that mutation was based on. A pending
/// row that has never synced (`last_synced_version == None`) diverges
/// against any canonical version: both sides wrote independently.
pub fn is_divergent(local: &LocalRow, remote_version: u64) -> bool {
    local.is_pending()
        && local
            .last_synced_version
            .map_or(true, |base| base != remote_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_meta::SyncStatus;

    fn pending_row(base: Option<u64>) -> LocalRow {
        let mut row = LocalRow::pending("s-1", json!({"name": "Ada"}), "device-a");
        row.last_synced_version = base;
        row
    }

    #[test]
    fn synced_row_never_diverges() {
        let row = LocalRow::synced("s-1", json!({}), "device-a", 3);
        assert!(!is_divergent(&row, 9));
    }

    #[test]
    fn pending_row_on_stale_base_diverges() {
        assert!(is_divergent(&pending_row(Some(3)), 4));
    }

    #[test]
    fn pending_row_on_current_base_does_not_diverge() {
        // The local edit was based on exactly the canonical version that is
        // arriving; upload will win the optimistic check.
        assert!(!is_divergent(&pending_row(Some(4)), 4));
    }

    #[test]
    fn never_synced_pending_row_diverges_against_any_remote() {
        assert!(is_divergent(&pending_row(None), 1));
    }

    #[test]
    fn conflict_status_is_not_pending() {
        let mut row = pending_row(Some(1));
        row.sync_status = SyncStatus::Conflict;
        assert!(!is_divergent(&row, 2));
    }

    #[test]
    fn policy_auto_resolution() {
        assert!(ResolutionPolicy::Local.auto_resolves());
        assert!(ResolutionPolicy::Remote.auto_resolves());
        assert!(!ResolutionPolicy::Manual.auto_resolves());
        assert_eq!(ResolutionPolicy::Local.as_resolution(), Resolution::Local);
        assert_eq!(ResolutionPolicy::Remote.as_resolution(), Resolution::Remote);
    }
}
