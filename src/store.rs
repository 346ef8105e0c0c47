use std::sync::{Arc, Mutex};

use crate::models::{Task, Timestamp, Workspace, WorkspaceFile};

const SCHEMA_VERSION: u32 = 1;

/// Shared snapshot of the remote workspace. Cheap to clone and safe to hand
/// to background tasks; readers get a copy of whatever the last refresh
/// installed.
#[derive(Clone)]
pub struct WorkspaceStore {
    inner: Arc<Mutex<Workspace>>,
}

impl WorkspaceStore {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            inner: Arc::new(Mutex::new(workspace)),
        }
    }

    pub fn snapshot(&self) -> Workspace {
        let guard = self.inner.lock().expect("state poisoned");
        guard.clone()
    }

    /// Installs a freshly fetched workspace wholesale; the remote is the
    /// source of truth.
    pub fn replace_all(&self, workspace: Workspace) {
        let mut guard = self.inner.lock().expect("state poisoned");
        *guard = workspace;
    }

    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn task_done(&self, task_id: &str) -> Option<bool> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.iter().find(|t| t.id == task_id).map(|t| t.is_done)
    }

    pub fn task_count(&self) -> usize {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.len()
    }

    /// Flips the local copy of a task after the remote confirmed the write,
    /// so readers see the new value before the next full refresh lands.
    pub fn apply_task_done(&self, task_id: &str, done: bool) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        match guard.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.is_done = done;
                true
            }
            None => false,
        }
    }

    pub fn cache_file(&self, fetched_at: Timestamp) -> WorkspaceFile {
        let guard = self.inner.lock().expect("state poisoned");
        WorkspaceFile {
            schema_version: SCHEMA_VERSION,
            fetched_at,
            workspace: guard.clone(),
        }
    }
}
