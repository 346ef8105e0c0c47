use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::models::RecordId;

type CommitFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type CommitFn = Box<dyn FnOnce() -> CommitFuture + Send>;

struct Entry {
    timer: JoinHandle<()>,
    commit: CommitFn,
}

/// Registry of completions waiting out their grace period.
///
/// Every scheduled completion lives here until exactly one of three things
/// consumes it: the timer expires and runs the commit, [`cancel`] drops it
/// without any remote write, or [`flush_all`] commits it early. Removal from
/// the map is the commit gate, so a completion can never run twice no matter
/// how the timer and a cancel race.
///
/// [`cancel`]: PendingCompletions::cancel
/// [`flush_all`]: PendingCompletions::flush_all
#[derive(Clone, Default)]
pub struct PendingCompletions {
    entries: Arc<Mutex<HashMap<RecordId, Entry>>>,
}

impl PendingCompletions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a grace timer for `task_id` and parks the commit until it fires.
    /// Returns `false` without touching anything if the task already has a
    /// pending completion.
    ///
    /// The registry lock is held across the spawn and the insert, so the
    /// timer can never observe a map without its own entry.
    pub fn schedule<F, Fut>(&self, task_id: RecordId, grace: Duration, commit: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut entries = self.entries.lock().expect("registry poisoned");
        if entries.contains_key(&task_id) {
            return false;
        }

        let registry = self.clone();
        let timer_id = task_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.fire(&timer_id).await;
        });

        entries.insert(
            task_id,
            Entry {
                timer,
                commit: Box::new(move || Box::pin(commit())),
            },
        );
        true
    }

    /// Aborts the timer and drops the commit unrun. Returns `false` if the
    /// task has no pending completion, which includes the case where the
    /// timer already fired and the write is on its way out.
    pub fn cancel(&self, task_id: &str) -> bool {
        let entry = {
            let mut entries = self.entries.lock().expect("registry poisoned");
            entries.remove(task_id)
        };
        match entry {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, task_id: &str) -> bool {
        let entries = self.entries.lock().expect("registry poisoned");
        entries.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().expect("registry poisoned");
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> HashSet<RecordId> {
        let entries = self.entries.lock().expect("registry poisoned");
        entries.keys().cloned().collect()
    }

    /// Commits every pending entry right now instead of waiting out the
    /// timers. Runs the commits one at a time and returns how many ran.
    pub async fn flush_all(&self) -> usize {
        let drained: Vec<(RecordId, Entry)> = {
            let mut entries = self.entries.lock().expect("registry poisoned");
            entries.drain().collect()
        };
        let mut flushed = 0;
        for (_, entry) in drained {
            entry.timer.abort();
            (entry.commit)().await;
            flushed += 1;
        }
        flushed
    }

    async fn fire(&self, task_id: &str) {
        let entry = {
            let mut entries = self.entries.lock().expect("registry poisoned");
            entries.remove(task_id)
        };
        // Absent means a cancel or flush got there first.
        if let Some(entry) = entry {
            (entry.commit)().await;
        }
    }
}
