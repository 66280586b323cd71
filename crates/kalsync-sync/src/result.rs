//! The outcome of one sync run.

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Success { summary: String },
    Failure { error: SyncError },
}

/// Counts and identifiers produced by one run, plus either a summary
/// (success) or an error (failure), never both.
///
/// A failed run still reports the entries it inserted and deleted before it
/// stopped, since those are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    added_ids: Vec<i64>,
    added_count: usize,
    deleted_count: usize,
    outcome: Outcome,
}

impl SyncResult {
    /// Creates a successful result; negative counts are clamped to zero.
    pub fn new(
        added_ids: Vec<i64>,
        added_count: i64,
        deleted_count: i64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            added_ids,
            added_count: clamp(added_count),
            deleted_count: clamp(deleted_count),
            outcome: Outcome::Success {
                summary: summary.into(),
            },
        }
    }

    /// Creates a successful result with the standard summary line.
    pub fn success(added_ids: Vec<i64>, skipped: usize, deleted_count: usize) -> Self {
        let added_count = added_ids.len();
        let summary = format!(
            "imported {} new entries ({} skipped, {} deleted)",
            added_count, skipped, deleted_count
        );
        Self {
            added_ids,
            added_count,
            deleted_count,
            outcome: Outcome::Success { summary },
        }
    }

    /// Creates a successful result for a run that only removed entries.
    pub fn purged(deleted_count: usize) -> Self {
        Self {
            added_ids: Vec::new(),
            added_count: 0,
            deleted_count,
            outcome: Outcome::Success {
                summary: format!("removed {} synced entries", deleted_count),
            },
        }
    }

    /// Creates a failed result that still records the partial work.
    pub fn failure(error: impl Into<SyncError>, added_ids: Vec<i64>, deleted_count: usize) -> Self {
        Self {
            added_count: added_ids.len(),
            added_ids,
            deleted_count,
            outcome: Outcome::Failure {
                error: error.into(),
            },
        }
    }

    /// Identifiers of the inserted entries, in insertion order.
    pub fn added_ids(&self) -> &[i64] {
        &self.added_ids
    }

    pub fn added_count(&self) -> usize {
        self.added_count
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    /// Summary line; set only on success.
    pub fn summary(&self) -> Option<&str> {
        match self.outcome {
            Outcome::Success { ref summary } => Some(summary.as_str()),
            Outcome::Failure { .. } => None,
        }
    }

    /// The error that ended the run; set only on failure.
    pub fn error(&self) -> Option<&SyncError> {
        match self.outcome {
            Outcome::Failure { ref error } => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

fn clamp(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn success_has_summary_only() {
        let result = SyncResult::success(vec![4, 5], 3, 1);

        assert!(result.is_success());
        assert_eq!(result.added_count(), 2);
        assert_eq!(result.added_ids(), &[4, 5]);
        assert_eq!(
            result.summary(),
            Some("imported 2 new entries (3 skipped, 1 deleted)")
        );
        assert!(result.error().is_none());
    }

    #[test]
    fn purged_summary() {
        let result = SyncResult::purged(3);
        assert_eq!(result.deleted_count(), 3);
        assert!(result.added_ids().is_empty());
        assert_eq!(result.summary(), Some("removed 3 synced entries"));
    }

    #[test]
    fn failure_has_error_only() {
        let result = SyncResult::failure(StoreError::QueryFailed("locked".into()), vec![7], 0);

        assert!(!result.is_success());
        assert!(result.summary().is_none());
        assert_eq!(result.added_ids(), &[7]);
        assert!(matches!(result.error(), Some(SyncError::Store(_))));
    }

    #[test]
    fn negative_counts_are_clamped() {
        let result = SyncResult::new(Vec::new(), -3, -1, "nothing");
        assert_eq!(result.added_count(), 0);
        assert_eq!(result.deleted_count(), 0);

        let result = SyncResult::new(vec![1], 1, 2, "ok");
        assert_eq!(result.deleted_count(), 2);
    }
}
