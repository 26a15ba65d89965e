//! Local, per-project snapshot cache.
//!
//! Each project's tasks are stored as one JSON document:
//! - `metadata`: project id, sync time and task count
//! - `tasks`: the task list in the order the API returned it
//!
//! A snapshot is only ever replaced whole; there is no merging between syncs.

mod snapshot;
mod store;

pub use snapshot::{Snapshot, SnapshotMetadata};
pub use store::CacheStore;
