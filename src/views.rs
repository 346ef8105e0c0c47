use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{ActivityEntry, RecordId, Task, Workspace};

/// The done state as displayed: the committed remote flag, or done while a
/// completion is pending.
pub fn effective_done(task: &Task, pending: &HashSet<RecordId>) -> bool {
    task.is_done || pending.contains(&task.id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub assigned_to: Option<RecordId>,
}

impl TaskFilter {
    fn matches(&self, task: &Task, pending: &HashSet<RecordId>) -> bool {
        let done = effective_done(task, pending);
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Open => !done,
            StatusFilter::Done => done,
        };
        let assignee_ok = match &self.assigned_to {
            Some(person) => task.assigned_to.as_deref() == Some(person.as_str()),
            None => true,
        };
        status_ok && assignee_ok
    }
}

/// One renderable list entry: the task, its display state, and its subtasks
/// nested one level deep.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub task: Task,
    pub pending: bool,
    pub effective_done: bool,
    pub subtasks: Vec<TaskRow>,
}

/// Rows for one project's task list: top-level tasks with their subtasks
/// attached, sorted by deadline (undated last), then title. The filter
/// applies to top-level tasks; subtasks ride along with their parent.
pub fn project_rows(
    workspace: &Workspace,
    pending: &HashSet<RecordId>,
    project_id: &str,
    filter: &TaskFilter,
) -> Vec<TaskRow> {
    rows_in_scope(workspace, pending, filter, |task| {
        task.project_id.as_deref() == Some(project_id)
    })
}

/// Rows for the personal list: tasks not scoped to any project.
pub fn personal_rows(
    workspace: &Workspace,
    pending: &HashSet<RecordId>,
    filter: &TaskFilter,
) -> Vec<TaskRow> {
    rows_in_scope(workspace, pending, filter, |task| task.project_id.is_none())
}

fn rows_in_scope(
    workspace: &Workspace,
    pending: &HashSet<RecordId>,
    filter: &TaskFilter,
    in_scope: impl Fn(&Task) -> bool,
) -> Vec<TaskRow> {
    let mut subtasks_by_parent: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in &workspace.tasks {
        if let Some(parent_id) = &task.parent_id {
            subtasks_by_parent
                .entry(parent_id.as_str())
                .or_default()
                .push(task);
        }
    }

    let mut rows: Vec<TaskRow> = workspace
        .tasks
        .iter()
        .filter(|task| task.is_top_level() && in_scope(task))
        .filter(|task| filter.matches(task, pending))
        .map(|task| {
            let mut children: Vec<TaskRow> = subtasks_by_parent
                .get(task.id.as_str())
                .map(|subs| {
                    subs.iter()
                        .map(|sub| make_row(sub, pending, Vec::new()))
                        .collect()
                })
                .unwrap_or_default();
            children.sort_by(|a, b| deadline_order(&a.task, &b.task));
            make_row(task, pending, children)
        })
        .collect();
    rows.sort_by(|a, b| deadline_order(&a.task, &b.task));
    rows
}

fn make_row(task: &Task, pending: &HashSet<RecordId>, subtasks: Vec<TaskRow>) -> TaskRow {
    TaskRow {
        pending: pending.contains(&task.id),
        effective_done: effective_done(task, pending),
        task: task.clone(),
        subtasks,
    }
}

fn deadline_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    (a.deadline.is_none(), a.deadline, a.title.as_str()).cmp(&(
        b.deadline.is_none(),
        b.deadline,
        b.title.as_str(),
    ))
}

/// Effectively-open tasks grouped by deadline urgency.
#[derive(Debug, Clone, Default)]
pub struct DeadlineBuckets {
    pub overdue: Vec<Task>,
    pub due_today: Vec<Task>,
    pub upcoming: Vec<Task>,
    pub unscheduled: Vec<Task>,
}

pub fn deadline_buckets(
    workspace: &Workspace,
    pending: &HashSet<RecordId>,
    today: NaiveDate,
) -> DeadlineBuckets {
    let mut buckets = DeadlineBuckets::default();
    for task in &workspace.tasks {
        if effective_done(task, pending) {
            continue;
        }
        match task.deadline {
            Some(date) if date < today => buckets.overdue.push(task.clone()),
            Some(date) if date == today => buckets.due_today.push(task.clone()),
            Some(_) => buckets.upcoming.push(task.clone()),
            None => buckets.unscheduled.push(task.clone()),
        }
    }
    for bucket in [
        &mut buckets.overdue,
        &mut buckets.due_today,
        &mut buckets.upcoming,
        &mut buckets.unscheduled,
    ] {
        bucket.sort_by(deadline_order);
    }
    buckets
}

/// Completion tallies for a project's progress bar. A task whose completion
/// is still pending counts as done, matching what the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCounts {
    pub done: usize,
    pub total: usize,
}

pub fn project_progress(
    workspace: &Workspace,
    pending: &HashSet<RecordId>,
    project_id: &str,
) -> ProgressCounts {
    let mut counts = ProgressCounts::default();
    for task in &workspace.tasks {
        if task.project_id.as_deref() != Some(project_id) {
            continue;
        }
        counts.total += 1;
        if effective_done(task, pending) {
            counts.done += 1;
        }
    }
    counts
}

pub fn tracked_minutes_for_project(workspace: &Workspace, project_id: &str) -> i64 {
    workspace
        .time_entries
        .iter()
        .filter(|entry| entry.project_id.as_deref() == Some(project_id))
        .map(|entry| entry.minutes)
        .sum()
}

pub fn tracked_minutes_for_task(workspace: &Workspace, task_id: &str) -> i64 {
    workspace
        .time_entries
        .iter()
        .filter(|entry| entry.task_id.as_deref() == Some(task_id))
        .map(|entry| entry.minutes)
        .sum()
}

/// The newest `limit` activity entries, most recent first.
pub fn recent_activity(workspace: &Workspace, limit: usize) -> Vec<ActivityEntry> {
    let mut entries = workspace.activity.clone();
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.created_at));
    entries.truncate(limit);
    entries
}
