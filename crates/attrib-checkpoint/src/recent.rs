// recent.rs: Append-only log of successful checkpoints.
//
// Only accepted checkpoints are recorded. Entries older than
// RECENT_WINDOW (relative to the newest entry) are pruned on write, and
// lookups filter by the caller's clock so a stale log never overcounts.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use attrib_classify::AttributionRange;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::payload::CheckpointKind;

/// How far back the activity count looks.
pub const RECENT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// One accepted checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChangeRecord {
    pub file_path: PathBuf,
    /// Attributed span; `None` for whole-file and human checkpoints.
    pub range: Option<AttributionRange>,
    pub timestamp_millis: i64,
    pub kind: CheckpointKind,
}

/// Shared, thread-safe activity log.
#[derive(Debug, Default)]
pub struct RecentActivity {
    records: Mutex<Vec<RecentChangeRecord>>,
}

impl RecentActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and prune everything that fell out of the window.
    pub fn record(&self, record: RecentChangeRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let newest = records
            .iter()
            .map(|r| r.timestamp_millis)
            .chain(std::iter::once(record.timestamp_millis))
            .max()
            .unwrap_or(record.timestamp_millis);
        records.push(record);
        let cutoff = newest - window_millis();
        records.retain(|r| r.timestamp_millis >= cutoff);
    }

    /// Record an event stamped with the current time.
    pub fn record_now(
        &self,
        file_path: impl Into<PathBuf>,
        range: Option<AttributionRange>,
        kind: CheckpointKind,
    ) {
        self.record(RecentChangeRecord {
            file_path: file_path.into(),
            range,
            timestamp_millis: Utc::now().timestamp_millis(),
            kind,
        });
    }

    /// Records within the window ending at `now_millis`.
    pub fn count_at(&self, now_millis: i64) -> usize {
        let cutoff = now_millis - window_millis();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.timestamp_millis >= cutoff)
            .count()
    }

    pub fn count(&self) -> usize {
        self.count_at(Utc::now().timestamp_millis())
    }

    /// Copy of the currently retained records, oldest first.
    pub fn snapshot(&self) -> Vec<RecentChangeRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn window_millis() -> i64 {
    RECENT_WINDOW.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn rec(path: &str, ts: i64) -> RecentChangeRecord {
        RecentChangeRecord {
            file_path: PathBuf::from(path),
            range: Some(AttributionRange::new(0, 10)),
            timestamp_millis: ts,
            kind: CheckpointKind::Agent,
        }
    }

    #[test]
    fn counts_only_records_inside_the_window() {
        let log = RecentActivity::new();
        log.record(rec("/repo/old.rs", NOW - 400_000));
        log.record(rec("/repo/new.rs", NOW - 10_000));
        assert_eq!(log.count_at(NOW), 1);
    }

    #[test]
    fn empty_log_counts_zero() {
        assert_eq!(RecentActivity::new().count(), 0);
    }

    #[test]
    fn pruning_keeps_recent_entries() {
        let log = RecentActivity::new();
        log.record(rec("/a", NOW - 600_000));
        log.record(rec("/b", NOW - 1_000));
        log.record(rec("/c", NOW));
        let paths: Vec<_> = log.snapshot().into_iter().map(|r| r.file_path).collect();
        assert_eq!(paths, vec![PathBuf::from("/b"), PathBuf::from("/c")]);
    }

    #[test]
    fn boundary_is_inclusive() {
        let log = RecentActivity::new();
        log.record(rec("/a", NOW - window_millis()));
        assert_eq!(log.count_at(NOW), 1);
        assert_eq!(log.count_at(NOW + 1), 0);
    }

    #[test]
    fn record_now_is_counted() {
        let log = RecentActivity::new();
        log.record_now("/repo/x.rs", None, CheckpointKind::Human);
        assert_eq!(log.count(), 1);
        assert_eq!(log.snapshot()[0].kind, CheckpointKind::Human);
    }
}
