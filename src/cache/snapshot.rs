//! Snapshot envelope persisted once per project.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::asana::Task;

/// Metadata stored alongside the tasks of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub project_id: String,
  /// When the sync that produced this snapshot ran
  pub synced_at: DateTime<Utc>,
  /// Always equal to the number of tasks in the snapshot
  pub task_count: usize,
}

impl SnapshotMetadata {
  /// How long ago the snapshot was written
  pub fn age(&self) -> Duration {
    Utc::now() - self.synced_at
  }

  /// Check if the snapshot is older than `max_age`.
  pub fn is_stale(&self, max_age: Duration) -> bool {
    self.age() > max_age
  }
}

/// One project's cached task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub metadata: SnapshotMetadata,
  pub tasks: Vec<Task>,
}

impl Snapshot {
  /// Reasons a decoded snapshot cannot be trusted for `project_id`.
  pub(crate) fn inconsistency(&self, project_id: &str) -> Option<String> {
    if self.metadata.task_count != self.tasks.len() {
      return Some(format!(
        "task_count is {} but {} tasks are stored",
        self.metadata.task_count,
        self.tasks.len()
      ));
    }
    if self.metadata.project_id != project_id {
      return Some(format!(
        "file belongs to project {}",
        self.metadata.project_id
      ));
    }
    None
  }
}

/// Borrowed form used when writing, so tasks need not be cloned.
#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
  pub metadata: &'a SnapshotMetadata,
  pub tasks: &'a [Task],
}

/// Metadata-only view of a snapshot file; the task array is skipped.
#[derive(Deserialize)]
pub(crate) struct MetadataEnvelope {
  pub metadata: SnapshotMetadata,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn metadata(synced_at: DateTime<Utc>) -> SnapshotMetadata {
    SnapshotMetadata {
      project_id: "p1".to_string(),
      synced_at,
      task_count: 0,
    }
  }

  #[test]
  fn test_fresh_snapshot_is_not_stale() {
    let meta = metadata(Utc::now());
    assert!(!meta.is_stale(Duration::minutes(5)));
  }

  #[test]
  fn test_old_snapshot_is_stale() {
    let meta = metadata(Utc::now() - Duration::minutes(10));
    assert!(meta.is_stale(Duration::minutes(5)));
    assert!(meta.age() >= Duration::minutes(10));
  }

  #[test]
  fn test_inconsistent_count_detected() {
    let snapshot = Snapshot {
      metadata: SnapshotMetadata {
        task_count: 2,
        ..metadata(Utc::now())
      },
      tasks: Vec::new(),
    };
    assert!(snapshot.inconsistency("p1").is_some());
  }

  #[test]
  fn test_foreign_project_detected() {
    let snapshot = Snapshot {
      metadata: metadata(Utc::now()),
      tasks: Vec::new(),
    };
    assert!(snapshot.inconsistency("p1").is_none());
    assert!(snapshot.inconsistency("p2").is_some());
  }
}
