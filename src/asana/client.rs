use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::api_types::{ApiErrorResponse, ApiTasksResponse};
use super::types::{Task, TaskFilters};
use super::TaskSource;

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Page size requested from list endpoints (Asana's maximum)
const PAGE_LIMIT: u32 = 100;

/// Fields requested for each task; Asana returns only gid and name otherwise
const TASK_OPT_FIELDS: &str = "name,notes,completed,due_on,due_at,assignee.name,assignee.email,\
priority_value.name,tags.name,created_at,modified_at";

/// Asana REST API client
#[derive(Clone)]
pub struct AsanaClient {
  http: reqwest::Client,
  base_url: String,
  token: String,
}

impl AsanaClient {
  /// Build a client bound to `token`. Never fails: a missing or invalid token
  /// surfaces as an error on each request instead.
  pub fn new(token: impl Into<String>) -> Self {
    Self::with_base_url(token, DEFAULT_BASE_URL)
  }

  pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.into(),
      token: token.into(),
    }
  }

  /// Fetch every task of a project, following pagination until exhausted.
  pub async fn fetch_project_tasks(
    &self,
    project_id: &str,
    filters: &TaskFilters,
  ) -> Result<Vec<Task>> {
    let mut all_tasks = Vec::new();
    let mut offset: Option<String> = None;

    loop {
      let url = self.project_tasks_url(project_id, filters, offset.as_deref())?;
      let page: ApiTasksResponse = self
        .get_json(url)
        .await
        .map_err(|e| eyre!("Failed to list tasks for project {}: {}", project_id, e))?;

      debug!(
        project = project_id,
        page_size = page.data.len(),
        "Fetched task page"
      );

      all_tasks.extend(
        page
          .data
          .into_iter()
          .map(Task::from)
          .filter(|task| filters.matches(task)),
      );

      match page.next_page {
        Some(next) => offset = Some(next.offset),
        None => break,
      }
    }

    Ok(all_tasks)
  }

  fn project_tasks_url(
    &self,
    project_id: &str,
    filters: &TaskFilters,
    offset: Option<&str>,
  ) -> Result<Url> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| eyre!("Invalid Asana base URL {}: {}", self.base_url, e))?;

    url
      .path_segments_mut()
      .map_err(|_| eyre!("Invalid Asana base URL {}", self.base_url))?
      .pop_if_empty()
      .extend(["projects", project_id, "tasks"]);

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("opt_fields", TASK_OPT_FIELDS);
      query.append_pair("limit", &PAGE_LIMIT.to_string());
      for (key, value) in filters.query_pairs() {
        query.append_pair(key, &value);
      }
      if let Some(offset) = offset {
        query.append_pair("offset", offset);
      }
    }

    Ok(url)
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    if self.token.is_empty() {
      return Err(eyre!("Asana API token not set"));
    }

    let response = self
      .http
      .get(url.clone())
      .bearer_auth(&self.token)
      .header(ACCEPT, "application/json")
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url.path(), e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(|err| err.message())
        .unwrap_or_else(|| body.trim().to_string());
      return Err(eyre!("API error ({}): {}", status.as_u16(), message));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url.path(), e))
  }
}

impl TaskSource for AsanaClient {
  fn list_tasks<'a>(
    &'a self,
    project_id: &'a str,
    filters: &'a TaskFilters,
  ) -> BoxFuture<'a, Result<Vec<Task>>> {
    self.fetch_project_tasks(project_id, filters).boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  #[test]
  fn test_project_tasks_url() {
    let client = AsanaClient::new("token");
    let url = client
      .project_tasks_url("1200", &TaskFilters::default(), None)
      .unwrap();
    assert_eq!(url.path(), "/api/1.0/projects/1200/tasks");

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("limit".to_string(), "100".to_string())));
    assert!(pairs.iter().any(|(k, _)| k == "opt_fields"));
    assert!(!pairs.iter().any(|(k, _)| k == "offset"));
  }

  #[test]
  fn test_project_tasks_url_with_filters_and_offset() {
    let client = AsanaClient::with_base_url("token", "http://localhost:8080/api/");
    let filters = TaskFilters {
      modified_since: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
      ..Default::default()
    };
    let url = client
      .project_tasks_url("a/b", &filters, Some("next"))
      .unwrap();

    // Project ids are escaped as a single path segment
    assert_eq!(url.path(), "/api/projects/a%2Fb/tasks");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&(
      "modified_since".to_string(),
      "2024-01-02T03:04:05+00:00".to_string()
    )));
    assert!(pairs.contains(&("offset".to_string(), "next".to_string())));
  }

  #[test]
  fn test_invalid_base_url_is_a_request_error() {
    let client = AsanaClient::with_base_url("token", "not a url");
    assert!(client
      .project_tasks_url("1", &TaskFilters::default(), None)
      .is_err());
  }

  #[tokio::test]
  async fn test_missing_token_fails_per_request() {
    let client = AsanaClient::new("");
    let err = client
      .list_tasks("1200", &TaskFilters::default())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("token not set"));
  }
}
