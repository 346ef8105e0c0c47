//! Headless core for an agency-operations dashboard: a remote-synced
//! workspace of clients, projects, tasks, time entries, and activity, plus
//! the deferred task-completion controller that gives "mark done" an undo
//! window before anything is persisted.
//!
//! Embedders construct a [`CompletionController`] over a [`RecordStore`]
//! implementation (the bundled `RestStore` behind the default `rest`
//! feature, or their own), subscribe to [`OpsEvent`]s, and render from the
//! builders in [`views`]. Canceling within the grace window reverts a
//! completion without a single remote round trip; teardown flushes whatever
//! is still pending.

pub mod controller;
pub mod events;
pub mod logging;
pub mod models;
pub mod pending;
pub mod remote;
pub mod storage;
pub mod store;
pub mod views;

pub use controller::{CompletionController, ToggleOutcome};
pub use events::OpsEvent;
pub use models::{Settings, Task, Workspace};
pub use pending::PendingCompletions;
pub use remote::{RecordStore, RemoteError};
pub use storage::{Storage, StorageError};
pub use store::WorkspaceStore;

#[cfg(feature = "rest")]
pub use remote::RestStore;
