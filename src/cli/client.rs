//! Lightweight HTTP client for CLI commands and the terminal UI.
//!
//! Client subcommands (`todod list`, `todod add`, `todod ui`, etc.) use this
//! to call the REST API of a running server.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::storage::TaskRow;

/// A short-lived HTTP client for CLI-to-server calls.
///
/// Every request carries a 5-second timeout; requests run to completion or
/// failure, there is no retry.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client targeting the server at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.url("/api/health"))
            .send()
            .await
            .context("could not reach the todod server — is it running?")?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        let resp = self
            .http
            .get(self.url("/api/todos"))
            .send()
            .await
            .context("could not reach the todod server — is it running?")?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_task(
        &self,
        name: &str,
        description: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<TaskRow> {
        let mut body = json!({ "name": name, "description": description });
        if let Some(deadline) = deadline {
            body["deadline"] = json!(deadline.to_rfc3339());
        }
        let resp = self
            .http
            .post(self.url("/api/todos"))
            .json(&body)
            .send()
            .await
            .context("could not reach the todod server — is it running?")?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<TaskRow> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/todos/{id}")))
            .json(&json!({ "completed": completed }))
            .send()
            .await
            .context("could not reach the todod server — is it running?")?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Surface the server's `{"error": …}` message on non-2xx responses.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let msg = body
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("server returned {status}"));
        anyhow::bail!(msg)
    }
}
