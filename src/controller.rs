use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::events::{self, OpsEvent};
use crate::models::{ActivityKind, NewActivity, RecordId, Workspace};
use crate::pending::PendingCompletions;
use crate::remote::{RecordStore, RemoteError};
use crate::storage::Storage;
use crate::store::WorkspaceStore;

/// What a toggle request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The task now reads as done; the remote write runs when the grace
    /// period expires.
    ScheduledCompletion,
    /// A still-pending completion was dropped before any remote write.
    CanceledPending,
    /// The task was committed done remotely and has been written back open.
    Reopened,
    /// A completion for this task is already in flight; nothing changed.
    AlreadyPending,
}

/// Drives the mark-done interaction: optimistic completion with an undo
/// window, immediate reopen, and a wholesale refresh after every committed
/// write.
///
/// One controller instance is shared by every surface that renders tasks, so
/// a completion pending in one list reads as pending everywhere. Cloning is
/// cheap; clones share the same store, registry, and event channel.
pub struct CompletionController<S: RecordStore> {
    inner: Arc<ControllerInner<S>>,
}

impl<S: RecordStore> Clone for CompletionController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ControllerInner<S: RecordStore> {
    store: WorkspaceStore,
    remote: Arc<S>,
    pending: PendingCompletions,
    events: broadcast::Sender<OpsEvent>,
    grace: Duration,
    cache: Option<Storage>,
}

impl<S: RecordStore + 'static> CompletionController<S> {
    pub fn new(store: WorkspaceStore, remote: Arc<S>, grace: Duration) -> Self {
        Self::build(store, remote, grace, None)
    }

    /// Like [`new`](Self::new), but every successful refresh also writes the
    /// workspace snapshot to `storage`, so the next start can render from
    /// disk before its first fetch completes.
    pub fn with_cache(
        store: WorkspaceStore,
        remote: Arc<S>,
        grace: Duration,
        storage: Storage,
    ) -> Self {
        Self::build(store, remote, grace, Some(storage))
    }

    fn build(
        store: WorkspaceStore,
        remote: Arc<S>,
        grace: Duration,
        cache: Option<Storage>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                store,
                remote,
                pending: PendingCompletions::new(),
                events: events::channel(),
                grace,
                cache,
            }),
        }
    }

    /// Single entry point for the done checkbox. `currently_done` is the
    /// state the caller is displaying, which already accounts for any
    /// pending completion.
    ///
    /// An open task gets an optimistic, deferred completion. A task shown
    /// done either drops its pending completion (no write ever happens) or,
    /// if the remote already committed it, is reopened immediately with no
    /// grace window.
    pub async fn request_toggle(
        &self,
        task_id: &str,
        currently_done: bool,
    ) -> Result<ToggleOutcome, RemoteError> {
        if !currently_done {
            return Ok(if self.inner.clone().schedule_completion(task_id) {
                ToggleOutcome::ScheduledCompletion
            } else {
                ToggleOutcome::AlreadyPending
            });
        }

        if self.inner.pending.cancel(task_id) {
            log::debug!("canceled pending completion for {task_id}");
            let _ = self.inner.events.send(OpsEvent::CompletionCanceled {
                task_id: task_id.to_string(),
            });
            return Ok(ToggleOutcome::CanceledPending);
        }

        self.inner.reopen(task_id).await?;
        Ok(ToggleOutcome::Reopened)
    }

    /// Commits every outstanding completion right now. Call this on
    /// teardown so no completion intent is lost; safe to call repeatedly.
    /// Returns how many entries were committed.
    pub async fn flush(&self) -> usize {
        self.inner.pending.flush_all().await
    }

    /// Re-pulls the whole workspace and replaces the local snapshot. A
    /// failure leaves the previous snapshot untouched.
    pub async fn refresh(&self) -> Result<(), RemoteError> {
        self.inner.refresh_all().await
    }

    /// The done state to display: the committed flag, or done while a
    /// completion is pending. `None` if the task is not in the snapshot.
    pub fn effective_done(&self, task_id: &str) -> Option<bool> {
        let raw = self.inner.store.task_done(task_id)?;
        Some(raw || self.inner.pending.contains(task_id))
    }

    pub fn is_pending(&self, task_id: &str) -> bool {
        self.inner.pending.contains(task_id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Snapshot pair the view builders consume: the workspace plus the ids
    /// of tasks whose completion is still pending.
    pub fn view_state(&self) -> (Workspace, HashSet<RecordId>) {
        (self.inner.store.snapshot(), self.inner.pending.snapshot())
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.inner.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OpsEvent> {
        self.inner.events.subscribe()
    }
}

impl<S: RecordStore + 'static> ControllerInner<S> {
    fn schedule_completion(self: Arc<Self>, task_id: &str) -> bool {
        let id = task_id.to_string();
        let inner = self.clone();
        let commit_id = id.clone();
        let scheduled = self.pending.schedule(id.clone(), self.grace, move || async move {
            inner.commit_completion(&commit_id).await;
        });
        if scheduled {
            log::debug!("completion for {id} scheduled in {:?}", self.grace);
            let _ = self.events.send(OpsEvent::CompletionScheduled { task_id: id });
        }
        scheduled
    }

    /// Runs once the grace period expires (or on flush). The pending entry
    /// is already consumed by the registry at this point, so on failure the
    /// effective state has rolled back to open by itself; all that is left
    /// is telling the user.
    async fn commit_completion(&self, task_id: &str) {
        match self.write_done_with_retry(task_id, true).await {
            Ok(()) => {
                self.store.apply_task_done(task_id, true);
                let _ = self.events.send(OpsEvent::TaskCompleted {
                    task_id: task_id.to_string(),
                });
                self.log_activity(ActivityKind::TaskCompleted, task_id).await;
                if let Err(err) = self.refresh_all().await {
                    log::warn!("refresh after completing {task_id} failed: {err}");
                }
            }
            Err(err) => {
                log::error!("completing {task_id} failed after retry: {err}");
                let _ = self.events.send(OpsEvent::CompletionRolledBack {
                    task_id: task_id.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    async fn reopen(&self, task_id: &str) -> Result<(), RemoteError> {
        self.write_done_with_retry(task_id, false).await?;
        self.store.apply_task_done(task_id, false);
        let _ = self.events.send(OpsEvent::TaskReopened {
            task_id: task_id.to_string(),
        });
        self.log_activity(ActivityKind::TaskReopened, task_id).await;
        if let Err(err) = self.refresh_all().await {
            log::warn!("refresh after reopening {task_id} failed: {err}");
        }
        Ok(())
    }

    async fn write_done_with_retry(&self, task_id: &str, done: bool) -> Result<(), RemoteError> {
        match self.remote.set_task_done(task_id, done).await {
            Ok(()) => Ok(()),
            Err(first) => {
                log::warn!("set_task_done({task_id}, {done}) failed, retrying once: {first}");
                self.remote.set_task_done(task_id, done).await
            }
        }
    }

    // Best-effort: the activity feed is informational, a lost row must not
    // fail the toggle.
    async fn log_activity(&self, action: ActivityKind, task_id: &str) {
        let entry = NewActivity {
            action,
            subject_id: Some(task_id.to_string()),
            detail: None,
        };
        if let Err(err) = self.remote.record_activity(entry).await {
            log::warn!(
                "recording {} for {task_id} failed: {err}",
                action.as_str()
            );
        }
    }

    async fn refresh_all(&self) -> Result<(), RemoteError> {
        let workspace = self.remote.fetch_workspace().await?;
        let task_count = workspace.tasks.len();
        self.store.replace_all(workspace);
        if let Some(cache) = &self.cache {
            let file = self.store.cache_file(chrono::Utc::now().timestamp());
            if let Err(err) = cache.save_cached_workspace(&file) {
                log::warn!("persisting workspace cache failed: {err}");
            }
        }
        let _ = self.events.send(OpsEvent::WorkspaceRefreshed { task_count });
        Ok(())
    }
}
