//! Periodic sync of a fixed project list into the local cache.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::asana::{AsanaClient, TaskFilters, TaskSource};
use crate::cache::CacheStore;
use crate::error::SyncError;

/// Time between sync passes unless configured otherwise
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Cloneable handle that asks a running daemon to exit after its current pass.
///
/// Stopping is idempotent and never blocks, so it can be called from a signal
/// handler, before `start`, or any number of times.
#[derive(Debug, Clone)]
pub struct StopHandle {
  token: CancellationToken,
}

impl Default for StopHandle {
  fn default() -> Self {
    Self {
      token: CancellationToken::new(),
    }
  }
}

impl StopHandle {
  pub fn stop(&self) {
    self.token.cancel();
  }

  pub fn is_stopped(&self) -> bool {
    self.token.is_cancelled()
  }
}

/// Result of syncing one project during a pass
#[derive(Debug)]
pub struct ProjectOutcome {
  pub project_id: String,
  /// Number of tasks written on success
  pub result: Result<usize, SyncError>,
}

/// Per-project results of one pass, in project order
#[derive(Debug)]
pub struct PassReport {
  pub started_at: DateTime<Utc>,
  pub outcomes: Vec<ProjectOutcome>,
}

impl PassReport {
  pub fn succeeded(&self) -> usize {
    self.outcomes.iter().filter(|o| o.result.is_ok()).count()
  }

  pub fn failed(&self) -> usize {
    self.outcomes.len() - self.succeeded()
  }

  pub fn outcome(&self, project_id: &str) -> Option<&ProjectOutcome> {
    self.outcomes.iter().find(|o| o.project_id == project_id)
  }
}

/// Sync daemon for a fixed, ordered set of projects.
///
/// Share it behind an `Arc` to query [`Daemon::last_sync`] while `start` runs.
pub struct Daemon<S: TaskSource> {
  source: S,
  store: CacheStore,
  project_ids: Vec<String>,
  interval: Duration,
  last_sync: Mutex<HashMap<String, DateTime<Utc>>>,
  stop: StopHandle,
}

impl Daemon<AsanaClient> {
  /// Daemon backed by the Asana API using `api_token`.
  pub fn from_token(api_token: &str, store: CacheStore, project_ids: Vec<String>) -> Self {
    Self::new(AsanaClient::new(api_token), store, project_ids)
  }
}

impl<S: TaskSource> Daemon<S> {
  /// Create a daemon. Duplicate project ids are dropped, keeping the first
  /// occurrence; an empty list is allowed and makes every pass a no-op.
  pub fn new(source: S, store: CacheStore, project_ids: Vec<String>) -> Self {
    let mut seen = HashSet::new();
    let project_ids = project_ids
      .into_iter()
      .filter(|id| {
        let first = seen.insert(id.clone());
        if !first {
          warn!(project = %id, "Ignoring duplicate project id");
        }
        first
      })
      .collect();

    Self {
      source,
      store,
      project_ids,
      interval: DEFAULT_SYNC_INTERVAL,
      last_sync: Mutex::new(HashMap::new()),
      stop: StopHandle::default(),
    }
  }

  /// Set the time between passes. A zero interval is raised to one millisecond.
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval.max(Duration::from_millis(1));
    self
  }

  pub fn project_ids(&self) -> &[String] {
    &self.project_ids
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  pub fn store(&self) -> &CacheStore {
    &self.store
  }

  /// Time of the most recent successful sync per project.
  pub fn last_sync(&self) -> HashMap<String, DateTime<Utc>> {
    self
      .last_sync
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone()
  }

  pub fn stop_handle(&self) -> StopHandle {
    self.stop.clone()
  }

  /// Ask the daemon to exit after the pass in progress, if any.
  pub fn stop(&self) {
    self.stop.stop();
  }

  /// Run until stopped: one pass immediately, then one per interval.
  ///
  /// The stop signal is checked between passes; a pass in progress always
  /// completes.
  pub async fn start(&self) {
    info!(
      projects = ?self.project_ids,
      interval_secs = self.interval.as_secs(),
      cache_dir = %self.store.dir().display(),
      "Starting sync daemon"
    );

    self.run_pass().await;

    let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = self.stop.token.cancelled() => {
          info!("Stop requested, exiting sync daemon");
          break;
        }
        _ = ticker.tick() => {
          self.run_pass().await;
        }
      }
    }
  }

  /// Sync every project once, in order. Failures are logged and recorded in
  /// the report; they never stop the pass.
  pub async fn run_pass(&self) -> PassReport {
    let started_at = Utc::now();
    let mut outcomes = Vec::with_capacity(self.project_ids.len());

    for project_id in &self.project_ids {
      let result = self.sync_project(project_id).await;
      match &result {
        Ok(count) => info!(
          project = %project_id,
          tasks = count,
          "Synced {} tasks for project {}",
          count,
          project_id
        ),
        Err(e) => warn!(project = %project_id, error = %e, "Error syncing project {}", project_id),
      }
      outcomes.push(ProjectOutcome {
        project_id: project_id.clone(),
        result,
      });
    }

    let report = PassReport {
      started_at,
      outcomes,
    };
    info!(
      succeeded = report.succeeded(),
      failed = report.failed(),
      "Sync pass complete"
    );
    report
  }

  async fn sync_project(&self, project_id: &str) -> Result<usize, SyncError> {
    let tasks = self
      .source
      .list_tasks(project_id, &TaskFilters::default())
      .await
      .map_err(SyncError::Fetch)?;

    let metadata = self.store.write_snapshot(project_id, &tasks)?;

    self
      .last_sync
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .insert(project_id.to_string(), Utc::now());

    Ok(metadata.task_count)
  }
}
