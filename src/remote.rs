use async_trait::async_trait;

use crate::models::{NewActivity, Workspace};

#[cfg(feature = "rest")]
use crate::models::Settings;

#[derive(Debug)]
pub enum RemoteError {
    /// The remote answered with a non-success status.
    Http { status: u16, body: String },
    /// The request never produced a response (connect, timeout, tls).
    Transport(String),
    Decode(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Http { status, body } => {
                write!(f, "remote returned http {status}: {body}")
            }
            RemoteError::Transport(err) => write!(f, "transport error: {err}"),
            RemoteError::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        RemoteError::Decode(value.to_string())
    }
}

#[cfg(feature = "rest")]
impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            RemoteError::Decode(value.to_string())
        } else {
            RemoteError::Transport(value.to_string())
        }
    }
}

/// Everything the controller needs from the backing record store. The
/// bundled [`RestStore`] talks to a PostgREST-style endpoint; tests and
/// embedders with their own sync layer substitute an in-memory impl.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_workspace(&self) -> Result<Workspace, RemoteError>;
    async fn set_task_done(&self, task_id: &str, done: bool) -> Result<(), RemoteError>;
    async fn record_activity(&self, entry: NewActivity) -> Result<(), RemoteError>;
}

/// REST client for a PostgREST-style record store. Reads use
/// `GET {base}/{table}?select=*`, writes filter with `id=eq.{id}` and ask the
/// server not to echo rows back.
#[cfg(feature = "rest")]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[cfg(feature = "rest")]
impl RestStore {
    pub fn from_settings(settings: &Settings) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        read_json(resp).await
    }
}

#[cfg(feature = "rest")]
#[async_trait]
impl RecordStore for RestStore {
    async fn fetch_workspace(&self) -> Result<Workspace, RemoteError> {
        Ok(Workspace {
            clients: self.list("clients").await?,
            projects: self.list("projects").await?,
            persons: self.list("persons").await?,
            tasks: self.list("tasks").await?,
            time_entries: self.list("time_entries").await?,
            activity: self.list("activity_log").await?,
        })
    }

    async fn set_task_done(&self, task_id: &str, done: bool) -> Result<(), RemoteError> {
        let resp = self
            .client
            .patch(self.table_url("tasks"))
            .query(&[("id", format!("eq.{task_id}"))])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "is_done": done }))
            .send()
            .await?;
        check_status(resp).await
    }

    async fn record_activity(&self, entry: NewActivity) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(self.table_url("activity_log"))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&entry)
            .send()
            .await?;
        check_status(resp).await
    }
}

#[cfg(feature = "rest")]
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(RemoteError::Http {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

#[cfg(feature = "rest")]
async fn check_status(resp: reqwest::Response) -> Result<(), RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await?;
    Err(RemoteError::Http {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status_and_body() {
        let err = RemoteError::Http {
            status: 401,
            body: "permission denied for table tasks".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote returned http 401: permission denied for table tasks"
        );
    }

    #[test]
    fn json_errors_map_to_decode() {
        let err = serde_json::from_str::<Workspace>("not json").unwrap_err();
        let err = RemoteError::from(err);
        assert!(matches!(err, RemoteError::Decode(_)));
        assert!(err.to_string().starts_with("decode error:"));
    }

    #[cfg(feature = "rest")]
    #[test]
    fn table_url_tolerates_trailing_slash() {
        let settings = Settings {
            api_base_url: "http://localhost:54321/rest/v1/".to_string(),
            ..Settings::default()
        };
        let store = RestStore::from_settings(&settings).expect("build store");
        assert_eq!(store.table_url("tasks"), "http://localhost:54321/rest/v1/tasks");
        assert_eq!(
            store.table_url("activity_log"),
            "http://localhost:54321/rest/v1/activity_log"
        );
    }
}
