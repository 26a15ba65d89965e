use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A task as persisted in the local cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub gid: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub completed: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_on: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignee: Option<User>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
  #[serde(default)]
  pub tags: Vec<Tag>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub modified_at: Option<DateTime<Utc>>,
}

impl Task {
  /// Due date, preferring the date part of `due_at` when both are set
  pub fn due_date(&self) -> Option<NaiveDate> {
    self.due_at.map(|at| at.date_naive()).or(self.due_on)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub gid: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub gid: String,
  #[serde(default)]
  pub name: String,
}

/// Optional refinements for a task listing. The default value means "all tasks".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
  /// Only incomplete tasks, plus tasks completed at or after this time
  pub completed_since: Option<DateTime<Utc>>,
  /// Only tasks modified at or after this time
  pub modified_since: Option<DateTime<Utc>>,
  /// Only tasks assigned to this user gid
  pub assignee: Option<String>,
}

impl TaskFilters {
  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }

  /// Filters the project tasks endpoint understands, as query parameters.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(since) = self.completed_since {
      pairs.push(("completed_since", since.to_rfc3339()));
    }
    if let Some(since) = self.modified_since {
      pairs.push(("modified_since", since.to_rfc3339()));
    }
    pairs
  }

  /// Client-side part of the filter (the project tasks endpoint has no assignee parameter).
  pub fn matches(&self, task: &Task) -> bool {
    match &self.assignee {
      Some(gid) => task.assignee.as_ref().is_some_and(|a| &a.gid == gid),
      None => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn task(gid: &str, assignee: Option<&str>) -> Task {
    Task {
      gid: gid.to_string(),
      name: format!("task {}", gid),
      description: String::new(),
      completed: false,
      due_on: None,
      due_at: None,
      assignee: assignee.map(|gid| User {
        gid: gid.to_string(),
        name: String::new(),
        email: None,
      }),
      priority: None,
      tags: Vec::new(),
      created_at: None,
      modified_at: None,
    }
  }

  #[test]
  fn test_default_filters_are_empty() {
    let filters = TaskFilters::default();
    assert!(filters.is_empty());
    assert!(filters.query_pairs().is_empty());
    assert!(filters.matches(&task("1", None)));
  }

  #[test]
  fn test_query_pairs_use_rfc3339() {
    let since = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let filters = TaskFilters {
      completed_since: Some(since),
      ..Default::default()
    };
    assert!(!filters.is_empty());
    assert_eq!(
      filters.query_pairs(),
      vec![("completed_since", "2024-03-01T12:00:00+00:00".to_string())]
    );
  }

  #[test]
  fn test_assignee_filter() {
    let filters = TaskFilters {
      assignee: Some("42".to_string()),
      ..Default::default()
    };
    assert!(filters.query_pairs().is_empty());
    assert!(filters.matches(&task("1", Some("42"))));
    assert!(!filters.matches(&task("2", Some("7"))));
    assert!(!filters.matches(&task("3", None)));
  }

  #[test]
  fn test_due_date_prefers_due_at() {
    let mut t = task("1", None);
    t.due_on = NaiveDate::from_ymd_opt(2024, 5, 1);
    assert_eq!(t.due_date(), NaiveDate::from_ymd_opt(2024, 5, 1));

    t.due_at = Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap());
    assert_eq!(t.due_date(), NaiveDate::from_ymd_opt(2024, 5, 2));
  }
}
