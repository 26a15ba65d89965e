//! Serde-deserializable types matching Asana API responses.
//!
//! These types are separate from domain types so the wire format's quirks
//! (mixed date formats, custom-field priorities) stay out of the cache format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::types::{Tag, Task, User};

// ============================================================================
// Lenient date handling
// ============================================================================

/// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
/// Bare dates are taken as midnight UTC.
fn parse_lenient_datetime(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

fn deserialize_lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => parse_lenient_datetime(s)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid date or datetime: {}", s))),
  }
}

fn deserialize_lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(deserialize_lenient_datetime(deserializer)?.map(|dt| dt.date_naive()))
}

// ============================================================================
// Task list endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub gid: String,
  #[serde(default)]
  pub name: String,
  pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTag {
  pub gid: String,
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTask {
  pub gid: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub completed: bool,
  #[serde(default, deserialize_with = "deserialize_lenient_date")]
  pub due_on: Option<NaiveDate>,
  #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
  pub due_at: Option<DateTime<Utc>>,
  pub assignee: Option<ApiUser>,
  // Either a plain string or an enum option object, depending on how the
  // workspace's priority custom field is exposed
  pub priority_value: Option<serde_json::Value>,
  #[serde(default)]
  pub tags: Vec<ApiTag>,
  #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
  pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiNextPage {
  pub offset: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTasksResponse {
  #[serde(default)]
  pub data: Vec<ApiTask>,
  pub next_page: Option<ApiNextPage>,
}

// ============================================================================
// Error response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
  pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
  #[serde(default)]
  pub errors: Vec<ApiErrorDetail>,
}

impl ApiErrorResponse {
  /// Join all error messages, or None if the body carried none.
  pub fn message(&self) -> Option<String> {
    if self.errors.is_empty() {
      return None;
    }
    Some(
      self
        .errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; "),
    )
  }
}

// ============================================================================
// Conversions to domain types
// ============================================================================

fn extract_priority(value: &serde_json::Value) -> Option<String> {
  match value {
    serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
    serde_json::Value::Object(obj) => obj
      .get("name")
      .and_then(|v| v.as_str())
      .map(String::from),
    _ => None,
  }
}

impl From<ApiUser> for User {
  fn from(user: ApiUser) -> Self {
    User {
      gid: user.gid,
      name: user.name,
      email: user.email,
    }
  }
}

impl From<ApiTag> for Tag {
  fn from(tag: ApiTag) -> Self {
    Tag {
      gid: tag.gid,
      name: tag.name,
    }
  }
}

impl From<ApiTask> for Task {
  fn from(task: ApiTask) -> Self {
    Task {
      gid: task.gid,
      name: task.name,
      description: task.notes.unwrap_or_default(),
      completed: task.completed,
      due_on: task.due_on,
      due_at: task.due_at,
      assignee: task.assignee.map(User::from),
      priority: task.priority_value.as_ref().and_then(extract_priority),
      tags: task.tags.into_iter().map(Tag::from).collect(),
      created_at: task.created_at,
      modified_at: task.modified_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_parse_task_page() {
    let body = r#"{
      "data": [
        {
          "gid": "1201",
          "name": "Write release notes",
          "notes": "For 0.2",
          "completed": false,
          "due_on": "2024-06-01",
          "due_at": null,
          "assignee": { "gid": "9", "name": "Sam", "email": "sam@example.com" },
          "priority_value": { "gid": "p1", "name": "High" },
          "tags": [{ "gid": "t1", "name": "docs" }],
          "created_at": "2024-05-01T10:00:00.000Z",
          "modified_at": "2024-05-02T11:30:00.000Z"
        },
        { "gid": "1202", "name": "Bare task" }
      ],
      "next_page": { "offset": "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9", "path": "/projects/1/tasks?offset=x", "uri": "https://app.asana.com/api/1.0/projects/1/tasks?offset=x" }
    }"#;

    let response: ApiTasksResponse = serde_json::from_str(body).unwrap();
    assert_eq!(response.data.len(), 2);
    assert_eq!(
      response.next_page.as_ref().map(|p| p.offset.as_str()),
      Some("eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9")
    );

    let tasks: Vec<Task> = response.data.into_iter().map(Task::from).collect();
    let first = &tasks[0];
    assert_eq!(first.description, "For 0.2");
    assert_eq!(first.due_on, NaiveDate::from_ymd_opt(2024, 6, 1));
    assert_eq!(first.due_at, None);
    assert_eq!(first.priority.as_deref(), Some("High"));
    assert_eq!(first.assignee.as_ref().map(|a| a.name.as_str()), Some("Sam"));
    assert_eq!(first.tags[0].name, "docs");
    assert_eq!(
      first.created_at,
      Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );

    let bare = &tasks[1];
    assert!(bare.description.is_empty());
    assert!(bare.assignee.is_none());
    assert!(bare.tags.is_empty());
  }

  #[test]
  fn test_lenient_dates_accept_both_formats() {
    let body = r#"{ "gid": "1", "due_on": "2024-06-01T15:00:00Z", "due_at": "2024-06-02" }"#;
    let task: ApiTask = serde_json::from_str(body).unwrap();
    assert_eq!(task.due_on, NaiveDate::from_ymd_opt(2024, 6, 1));
    assert_eq!(
      task.due_at,
      Some(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap())
    );
  }

  #[test]
  fn test_invalid_date_is_rejected() {
    let body = r#"{ "gid": "1", "due_on": "next tuesday" }"#;
    assert!(serde_json::from_str::<ApiTask>(body).is_err());
  }

  #[test]
  fn test_string_priority() {
    let body = r#"{ "gid": "1", "priority_value": "low" }"#;
    let task: Task = serde_json::from_str::<ApiTask>(body).unwrap().into();
    assert_eq!(task.priority.as_deref(), Some("low"));
  }

  #[test]
  fn test_error_message_joined() {
    let body = r#"{ "errors": [{ "message": "project: Not a valid gid" }, { "message": "try again" }] }"#;
    let err: ApiErrorResponse = serde_json::from_str(body).unwrap();
    assert_eq!(
      err.message().as_deref(),
      Some("project: Not a valid gid; try again")
    );
  }
}
