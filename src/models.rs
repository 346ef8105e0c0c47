use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type RecordId = String;
pub type Timestamp = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Person {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub is_done: bool,
    #[serde(default)]
    pub project_id: Option<RecordId>,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub assigned_to: Option<RecordId>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Timestamp,
}

impl Task {
    /// Tasks nest exactly one level: a task either has no parent or its
    /// parent is a top-level task.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeEntry {
    pub id: RecordId,
    pub minutes: i64,
    #[serde(default)]
    pub project_id: Option<RecordId>,
    #[serde(default)]
    pub task_id: Option<RecordId>,
    #[serde(default)]
    pub person_id: Option<RecordId>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub logged_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    TaskCreated,
    TaskCompleted,
    TaskReopened,
    ProjectCreated,
    TimeLogged,
    Other,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::TaskCreated => "task_created",
            ActivityKind::TaskCompleted => "task_completed",
            ActivityKind::TaskReopened => "task_reopened",
            ActivityKind::ProjectCreated => "project_created",
            ActivityKind::TimeLogged => "time_logged",
            ActivityKind::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "task_created" => ActivityKind::TaskCreated,
            "task_completed" => ActivityKind::TaskCompleted,
            "task_reopened" => ActivityKind::TaskReopened,
            "project_created" => ActivityKind::ProjectCreated,
            "time_logged" => ActivityKind::TimeLogged,
            _ => ActivityKind::Other,
        }
    }
}

// The remote stores the action as a plain text column; rows inserted by newer
// deployments must not break older clients, so unknown values map to `Other`
// instead of failing the whole fetch.
impl Serialize for ActivityKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ActivityKind::parse(&value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivityEntry {
    pub id: RecordId,
    pub action: ActivityKind,
    #[serde(default)]
    pub subject_id: Option<RecordId>,
    #[serde(default)]
    pub actor_id: Option<RecordId>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub created_at: Timestamp,
}

/// Insert payload for the activity log; the remote assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NewActivity {
    pub action: ActivityKind,
    pub subject_id: Option<RecordId>,
    pub detail: Option<String>,
}

/// Everything the dashboard renders from, fetched wholesale from the remote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Workspace {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkspaceFile {
    pub schema_version: u32,
    pub fetched_at: Timestamp,
    #[serde(default)]
    pub workspace: Workspace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            grace_period_ms: default_grace_period_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

fn default_api_base_url() -> String {
    // Matches the local record-store emulator; deployments override this.
    "http://localhost:54321/rest/v1".to_string()
}

fn default_grace_period_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, "http://localhost:54321/rest/v1");
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.grace_period_ms, 3000);
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.grace_period(), std::time::Duration::from_secs(3));
    }

    #[test]
    fn settings_serde_applies_defaults_for_missing_fields() {
        let json = r#"{ "api_key": "service-role-key" }"#;
        let settings: Settings = serde_json::from_str(json).expect("settings should deserialize");
        assert_eq!(settings.api_key, "service-role-key");
        assert_eq!(settings.api_base_url, "http://localhost:54321/rest/v1");
        assert_eq!(settings.grace_period_ms, 3000);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn task_optional_columns_default_when_missing() {
        let json = r#"{ "id": "t1", "title": "kickoff deck", "is_done": false }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.id, "t1");
        assert!(!task.is_done);
        assert!(task.project_id.is_none());
        assert!(task.parent_id.is_none());
        assert!(task.assigned_to.is_none());
        assert!(task.deadline.is_none());
        assert!(task.notes.is_none());
        assert_eq!(task.created_at, 0);
        assert!(task.is_top_level());
    }

    #[test]
    fn deadline_uses_date_wire_format() {
        let json =
            r#"{ "id": "t1", "title": "invoice", "is_done": false, "deadline": "2026-03-31" }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(
            task.deadline,
            Some(NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date"))
        );

        let value = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(value["deadline"], serde_json::json!("2026-03-31"));
    }

    #[test]
    fn activity_kind_round_trips_and_tolerates_unknown_values() {
        let entry: ActivityEntry = serde_json::from_str(
            r#"{ "id": "a1", "action": "task_completed", "subject_id": "t1" }"#,
        )
        .expect("entry should deserialize");
        assert_eq!(entry.action, ActivityKind::TaskCompleted);
        assert_eq!(entry.subject_id.as_deref(), Some("t1"));

        // Unknown actions (e.g. rows written by a newer deployment) must not
        // fail the whole fetch.
        let entry: ActivityEntry =
            serde_json::from_str(r#"{ "id": "a2", "action": "billing_exported" }"#)
                .expect("entry should deserialize");
        assert_eq!(entry.action, ActivityKind::Other);

        let value = serde_json::to_value(ActivityKind::TaskReopened).expect("serialize kind");
        assert_eq!(value, serde_json::json!("task_reopened"));
    }

    #[test]
    fn project_status_defaults_to_active() {
        let json = r#"{ "id": "p1", "name": "Website relaunch" }"#;
        let project: Project = serde_json::from_str(json).expect("project should deserialize");
        assert_eq!(project.status, ProjectStatus::Active);
        assert!(project.client_id.is_none());
    }

    #[test]
    fn workspace_file_defaults_missing_collections() {
        let json = r#"
        {
          "schema_version": 1,
          "fetched_at": 1756000000,
          "workspace": {
            "tasks": [{ "id": "t1", "title": "retro notes", "is_done": true }]
          }
        }
        "#;
        let file: WorkspaceFile = serde_json::from_str(json).expect("file should deserialize");
        assert_eq!(file.schema_version, 1);
        assert_eq!(file.workspace.tasks.len(), 1);
        assert!(file.workspace.clients.is_empty());
        assert!(file.workspace.projects.is_empty());
        assert!(file.workspace.time_entries.is_empty());
        assert!(file.workspace.activity.is_empty());
    }

    #[test]
    fn new_activity_serializes_snake_case_action() {
        let payload = NewActivity {
            action: ActivityKind::TaskCompleted,
            subject_id: Some("t9".to_string()),
            detail: None,
        };
        let value = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(
            value,
            serde_json::json!({
              "action": "task_completed",
              "subject_id": "t9",
              "detail": null
            })
        );
    }
}
