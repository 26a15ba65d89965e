//! Error types for cache and sync operations.
//!
//! Callers need to tell "never synced" apart from "synced but unreadable", and
//! fetch failures apart from cache failures, so these are typed rather than
//! plain `eyre` reports.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the on-disk snapshot cache
#[derive(Error, Debug)]
pub enum CacheError {
  /// No snapshot exists for the project. Expected before the first sync and
  /// after a clear.
  #[error("No cached snapshot for project {project_id}")]
  NotFound { project_id: String },

  /// A snapshot file exists but does not decode into a consistent snapshot
  #[error("Cached snapshot for project {project_id} is corrupt: {reason}")]
  Corrupt { project_id: String, reason: String },

  #[error("Cache I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to encode snapshot for project {project_id}: {source}")]
  Encode {
    project_id: String,
    #[source]
    source: serde_json::Error,
  },
}

impl CacheError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, CacheError::NotFound { .. })
  }

  pub fn is_corrupt(&self) -> bool {
    matches!(self, CacheError::Corrupt { .. })
  }

  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> CacheError {
    let path = path.into();
    move |source| CacheError::Io { path, source }
  }
}

/// Why a single project failed to sync during a pass
#[derive(Error, Debug)]
pub enum SyncError {
  #[error("Fetch failed: {0}")]
  Fetch(color_eyre::Report),

  #[error(transparent)]
  Cache(#[from] CacheError),
}
