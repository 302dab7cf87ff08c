// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed HTTP client over the daemon's surface.
//!
//! One function per daemon mutation, each carrying the discovered
//! credential. `can_write` is the one call that never errors: any
//! transport or daemon failure becomes a structured deny.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use teamd_core::{InboxEvent, Task, TaskId, ThreadId, ThreadMessage, ThreadRecord};
use thiserror::Error;
use tracing::warn;

use crate::discovery::Discovery;

/// Client errors
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Daemon error {code}: {message}")]
    Api { code: String, message: String },
}

/// Write-permission decision as returned by the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteDecision {
    pub allow: bool,
    pub reason: String,
}

impl WriteDecision {
    fn deny(reason: &str) -> Self {
        Self {
            allow: false,
            reason: reason.to_string(),
        }
    }
}

/// A page of inbox events plus the cursor to resume from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxPage {
    pub events: Vec<InboxEvent>,
    pub next_since: u64,
}

/// Inputs to task creation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<TaskId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    task: Task,
}

#[derive(Deserialize)]
struct ThreadEnvelope {
    thread: ThreadRecord,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: ThreadMessage,
}

/// Result of (possibly idempotent) task creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    pub task: Task,
    pub created: bool,
}

#[derive(Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    code: String,
    message: String,
}

/// HTTP client bound to one discovered daemon and identity.
pub struct GuardClient {
    http: reqwest::Client,
    discovery: Discovery,
}

impl GuardClient {
    pub fn new(discovery: Discovery) -> Self {
        Self {
            http: reqwest::Client::new(),
            discovery,
        }
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.discovery.url.trim_end_matches('/'), path)
    }

    fn scope(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(team) = &self.discovery.team_id {
            query.push(("teamId", team.to_string()));
        }
        query
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GuardError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status();
        match response.json::<WireError>().await {
            Ok(wire) => Err(GuardError::Api {
                code: wire.error.code,
                message: wire.error.message,
            }),
            Err(_) => Err(GuardError::Api {
                code: status.as_u16().to_string(),
                message: "unparseable error body".to_string(),
            }),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GuardError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.discovery.token)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    // ----- write permission -----

    /// Ask whether the discovered identity may mutate `path`. On any
    /// failure the answer is a deny, never an error.
    pub async fn can_write(&self, path: &str) -> WriteDecision {
        let mut query = self.scope();
        query.push(("agentId", self.discovery.agent_id.to_string()));
        query.push(("path", path.to_string()));

        let result = async {
            let response = self
                .http
                .get(self.endpoint("/v1/can-write"))
                .bearer_auth(&self.discovery.token)
                .query(&query)
                .send()
                .await?;
            Self::decode::<WriteDecision>(response).await
        }
        .await;

        match result {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, path, "can-write probe failed; denying");
                WriteDecision::deny("can_write_check_failed")
            }
        }
    }

    // ----- inbox -----

    /// Events after `since` for the discovered identity.
    pub async fn fetch_inbox(&self, since: u64) -> Result<InboxPage, GuardError> {
        let mut query = self.scope();
        query.push(("agentId", self.discovery.agent_id.to_string()));
        query.push(("since", since.to_string()));

        let response = self
            .http
            .get(self.endpoint("/v1/inbox"))
            .bearer_auth(&self.discovery.token)
            .query(&query)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// One compact steering line per new event, plus the next cursor.
    pub async fn poll_inbox(&self, since: u64) -> Result<(Vec<String>, u64), GuardError> {
        let page = self.fetch_inbox(since).await?;
        let lines = page
            .events
            .iter()
            .map(crate::intercept::summarize_event)
            .collect();
        Ok((lines, page.next_since))
    }

    // ----- task mutations -----

    pub async fn create_task(
        &self,
        task: NewTask,
        idempotency_key: Option<&str>,
    ) -> Result<CreatedTask, GuardError> {
        let mut body = serde_json::to_value(&task).unwrap_or_default();
        if let Some(team) = &self.discovery.team_id {
            body["teamId"] = json!(team);
        }
        let mut request = self
            .http
            .post(self.endpoint("/v1/tasks"))
            .bearer_auth(&self.discovery.token)
            .json(&body);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        Self::decode(request.send().await?).await
    }

    pub async fn claim_task(
        &self,
        task_id: &TaskId,
        ttl_ms: Option<u64>,
    ) -> Result<Task, GuardError> {
        let body = self.identity_body(json!({ "ttlMs": ttl_ms }));
        let envelope: TaskEnvelope = self
            .post(&format!("/v1/tasks/{task_id}/claim"), body)
            .await?;
        Ok(envelope.task)
    }

    pub async fn renew_task(
        &self,
        task_id: &TaskId,
        epoch: u64,
        ttl_ms: Option<u64>,
    ) -> Result<Task, GuardError> {
        let body = self.identity_body(json!({ "epoch": epoch, "ttlMs": ttl_ms }));
        let envelope: TaskEnvelope = self
            .post(&format!("/v1/tasks/{task_id}/renew"), body)
            .await?;
        Ok(envelope.task)
    }

    pub async fn complete_task(&self, task_id: &TaskId, epoch: u64) -> Result<Task, GuardError> {
        let body = self.identity_body(json!({ "epoch": epoch }));
        let envelope: TaskEnvelope = self
            .post(&format!("/v1/tasks/{task_id}/complete"), body)
            .await?;
        Ok(envelope.task)
    }

    pub async fn fail_task(&self, task_id: &TaskId, epoch: u64) -> Result<Task, GuardError> {
        let body = self.identity_body(json!({ "epoch": epoch }));
        let envelope: TaskEnvelope = self
            .post(&format!("/v1/tasks/{task_id}/fail"), body)
            .await?;
        Ok(envelope.task)
    }

    // ----- thread mutations -----

    pub async fn start_thread(
        &self,
        title: &str,
        participants: &[&str],
        task_id: Option<&TaskId>,
    ) -> Result<ThreadRecord, GuardError> {
        let mut body = self.identity_body(json!({
            "title": title,
            "participants": participants,
            "originator": self.discovery.agent_id,
        }));
        if let Some(task_id) = task_id {
            body["taskId"] = json!(task_id);
        }
        let envelope: ThreadEnvelope = self.post("/v1/threads", body).await?;
        Ok(envelope.thread)
    }

    pub async fn post_message(
        &self,
        thread_id: &ThreadId,
        message: &str,
    ) -> Result<ThreadMessage, GuardError> {
        let body = self.identity_body(json!({ "body": message }));
        let envelope: MessageEnvelope = self
            .post(&format!("/v1/threads/{thread_id}/messages"), body)
            .await?;
        Ok(envelope.message)
    }

    pub async fn link_thread(
        &self,
        thread_id: &ThreadId,
        task_id: &TaskId,
    ) -> Result<ThreadRecord, GuardError> {
        let body = self.identity_body(json!({ "taskId": task_id }));
        let envelope: ThreadEnvelope = self
            .post(&format!("/v1/threads/{thread_id}/link"), body)
            .await?;
        Ok(envelope.thread)
    }

    /// Stamp the discovered identity and team scope onto a request body.
    fn identity_body(&self, mut body: serde_json::Value) -> serde_json::Value {
        body["agentId"] = json!(self.discovery.agent_id);
        if let Some(team) = &self.discovery.team_id {
            body["teamId"] = json!(team);
        }
        body
    }
}
