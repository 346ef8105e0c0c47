use tokio::sync::broadcast;

use crate::models::RecordId;

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications pushed to whatever frontend is embedding the core. Lagging
/// subscribers lose the oldest events rather than blocking the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum OpsEvent {
    CompletionScheduled { task_id: RecordId },
    CompletionCanceled { task_id: RecordId },
    TaskCompleted { task_id: RecordId },
    TaskReopened { task_id: RecordId },
    CompletionRolledBack { task_id: RecordId, reason: String },
    WorkspaceRefreshed { task_count: usize },
}

pub fn channel() -> broadcast::Sender<OpsEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}
