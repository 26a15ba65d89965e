//! Asana API collaborator: wire types, domain types and the HTTP client.

mod api_types;
mod client;
mod types;

use color_eyre::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

pub use client::{AsanaClient, DEFAULT_BASE_URL};
pub use types::{Tag, Task, TaskFilters, User};

/// Anything that can list the tasks of a project.
///
/// The sync daemon only depends on this trait, so tests can substitute a stub
/// for the real [`AsanaClient`].
pub trait TaskSource: Send + Sync {
  fn list_tasks<'a>(
    &'a self,
    project_id: &'a str,
    filters: &'a TaskFilters,
  ) -> BoxFuture<'a, Result<Vec<Task>>>;
}

impl<T: TaskSource + ?Sized> TaskSource for Arc<T> {
  fn list_tasks<'a>(
    &'a self,
    project_id: &'a str,
    filters: &'a TaskFilters,
  ) -> BoxFuture<'a, Result<Vec<Task>>> {
    self.as_ref().list_tasks(project_id, filters)
  }
}
