//! File-backed snapshot store: one JSON file per project.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::snapshot::{MetadataEnvelope, Snapshot, SnapshotMetadata, SnapshotRef};
use crate::asana::Task;
use crate::error::CacheError;

const SNAPSHOT_PREFIX: &str = "project-";
const HASHED_PREFIX: &str = "hashed-";
const SNAPSHOT_EXTENSION: &str = "json";

/// Replace-on-write snapshot storage rooted at a single directory.
///
/// Writes go to a temp file in the same directory and are renamed into place,
/// so a concurrent reader sees either the previous snapshot or the new one.
#[derive(Debug, Clone)]
pub struct CacheStore {
  dir: PathBuf,
}

impl CacheStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Open a store at the default location. The directory itself is created
  /// lazily on first write.
  pub fn open_default() -> Result<Self> {
    Ok(Self::new(Self::default_dir()?))
  }

  /// Get the default cache directory
  pub fn default_dir() -> Result<PathBuf> {
    if let Some(cache_dir) = dirs::cache_dir() {
      return Ok(cache_dir.join("asana-sync"));
    }
    dirs::home_dir()
      .map(|home| home.join(".asana-cache"))
      .ok_or_else(|| eyre!("Could not determine cache directory"))
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Path of the snapshot file for `project_id`. Derived from the id alone.
  pub fn snapshot_path(&self, project_id: &str) -> PathBuf {
    self.dir.join(snapshot_file_name(project_id))
  }

  /// Persist `tasks` as the new snapshot for `project_id`, replacing any
  /// previous one.
  pub fn write_snapshot(
    &self,
    project_id: &str,
    tasks: &[Task],
  ) -> Result<SnapshotMetadata, CacheError> {
    self.ensure_dir()?;
    let path = self.snapshot_path(project_id);

    let metadata = SnapshotMetadata {
      project_id: project_id.to_string(),
      synced_at: next_synced_at(&path),
      task_count: tasks.len(),
    };

    let data = serde_json::to_vec_pretty(&SnapshotRef {
      metadata: &metadata,
      tasks,
    })
    .map_err(|source| CacheError::Encode {
      project_id: project_id.to_string(),
      source,
    })?;

    // Temp files are created owner read/write only
    let mut temp = tempfile::Builder::new()
      .prefix(".snapshot-")
      .suffix(".tmp")
      .tempfile_in(&self.dir)
      .map_err(CacheError::io(&self.dir))?;
    temp
      .write_all(&data)
      .and_then(|_| temp.as_file().sync_all())
      .map_err(CacheError::io(temp.path()))?;
    temp
      .persist(&path)
      .map_err(|e| CacheError::io(&path)(e.error))?;

    debug!(
      project = project_id,
      tasks = metadata.task_count,
      path = %path.display(),
      "Wrote snapshot"
    );

    Ok(metadata)
  }

  /// Load the snapshot for `project_id`. Freshness is not checked.
  pub fn read_snapshot(&self, project_id: &str) -> Result<Snapshot, CacheError> {
    let path = self.snapshot_path(project_id);

    let data = match fs::read(&path) {
      Ok(data) => data,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        return Err(CacheError::NotFound {
          project_id: project_id.to_string(),
        })
      }
      Err(e) => return Err(CacheError::io(&path)(e)),
    };

    let snapshot: Snapshot =
      serde_json::from_slice(&data).map_err(|e| CacheError::Corrupt {
        project_id: project_id.to_string(),
        reason: e.to_string(),
      })?;

    if let Some(reason) = snapshot.inconsistency(project_id) {
      return Err(CacheError::Corrupt {
        project_id: project_id.to_string(),
        reason,
      });
    }

    Ok(snapshot)
  }

  /// Delete the snapshot for `project_id`. Clearing a project that has no
  /// snapshot yields [`CacheError::NotFound`].
  pub fn clear(&self, project_id: &str) -> Result<(), CacheError> {
    let path = self.snapshot_path(project_id);
    match fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound {
        project_id: project_id.to_string(),
      }),
      Err(e) => Err(CacheError::io(&path)(e)),
    }
  }

  /// Total size in bytes of all files in the cache directory. A directory
  /// that was never created counts as empty.
  pub fn total_size(&self) -> Result<u64, CacheError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
      Err(e) => return Err(CacheError::io(&self.dir)(e)),
    };

    let mut total = 0;
    for entry in entries {
      let entry = entry.map_err(CacheError::io(&self.dir))?;
      match entry.metadata() {
        Ok(meta) if meta.is_file() => total += meta.len(),
        Ok(_) => {}
        // Removed between listing and stat
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(CacheError::io(entry.path())(e)),
      }
    }

    Ok(total)
  }

  /// Metadata of every readable snapshot, sorted by project id.
  pub fn list(&self) -> Result<Vec<SnapshotMetadata>, CacheError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(CacheError::io(&self.dir)(e)),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
      let path = entry.map_err(CacheError::io(&self.dir))?.path();
      if !is_snapshot_file(&path) {
        continue;
      }
      match read_metadata(&path) {
        Some(metadata) => snapshots.push(metadata),
        None => warn!(path = %path.display(), "Skipping unreadable snapshot"),
      }
    }

    snapshots.sort_by(|a, b| a.project_id.cmp(&b.project_id));
    Ok(snapshots)
  }

  fn ensure_dir(&self) -> Result<(), CacheError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::DirBuilderExt;
      builder.mode(0o700);
    }
    builder
      .create(&self.dir)
      .map_err(CacheError::io(&self.dir))
  }
}

/// File name for a project's snapshot. Ids that are safe as file names on any
/// filesystem (lowercase ASCII, digits, `-`, `_`) are used verbatim; anything
/// else is hashed so it cannot escape the directory or collide by case.
fn snapshot_file_name(project_id: &str) -> String {
  let is_plain = !project_id.is_empty()
    && project_id
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

  if is_plain {
    format!("{}{}.{}", SNAPSHOT_PREFIX, project_id, SNAPSHOT_EXTENSION)
  } else {
    let mut hasher = Sha256::new();
    hasher.update(project_id.as_bytes());
    format!(
      "{}{}.{}",
      HASHED_PREFIX,
      hex::encode(hasher.finalize()),
      SNAPSHOT_EXTENSION
    )
  }
}

fn is_snapshot_file(path: &Path) -> bool {
  let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
    return false;
  };
  (name.starts_with(SNAPSHOT_PREFIX) || name.starts_with(HASHED_PREFIX))
    && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
}

fn read_metadata(path: &Path) -> Option<SnapshotMetadata> {
  let data = fs::read(path).ok()?;
  serde_json::from_slice::<MetadataEnvelope>(&data)
    .ok()
    .map(|envelope| envelope.metadata)
}

/// Timestamp for a new snapshot, never earlier than the one it replaces.
fn next_synced_at(path: &Path) -> DateTime<Utc> {
  let now = Utc::now();
  match read_metadata(path) {
    Some(previous) if previous.synced_at > now => previous.synced_at,
    _ => now,
  }
}
