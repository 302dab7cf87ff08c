// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.
//!
//! Each spec gets an in-process daemon over a throwaway workspace and a
//! bearer-authenticated HTTP client against it.

#![allow(dead_code)]

use tempfile::TempDir;
use teamd_core::TeamId;
use teamd_daemon::{startup, Config, DaemonHandle};

pub const TEAM: &str = "alpha";

/// A running daemon plus the workspace it owns.
pub struct Harness {
    pub dir: TempDir,
    pub handle: DaemonHandle,
    pub http: reqwest::Client,
}

pub fn config_for(dir: &TempDir) -> Config {
    Config {
        workspace_root: dir.path().to_owned(),
        team_id: TeamId::new(TEAM),
        port: 0,
        token: None,
    }
}

/// Start a daemon over a fresh workspace.
pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let handle = startup(&config_for(&dir)).await.unwrap();
    Harness {
        dir,
        handle,
        http: reqwest::Client::new(),
    }
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.handle.url(), path)
    }

    pub fn team_dir(&self) -> std::path::PathBuf {
        self.dir.path().join(TEAM)
    }

    pub async fn get(&self, path: &str) -> (u16, serde_json::Value) {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(self.handle.token())
            .send()
            .await
            .unwrap();
        decode(response).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.handle.token())
            .json(&body)
            .send()
            .await
            .unwrap();
        decode(response).await
    }

    pub async fn post_with_header(
        &self,
        path: &str,
        header: (&str, &str),
        body: serde_json::Value,
    ) -> (u16, serde_json::Value) {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.handle.token())
            .header(header.0, header.1)
            .json(&body)
            .send()
            .await
            .unwrap();
        decode(response).await
    }

    /// Create a pending task and return its id.
    pub async fn create_task(&self, title: &str) -> String {
        let (status, body) = self
            .post("/v1/tasks", serde_json::json!({ "title": title }))
            .await;
        assert_eq!(status, 201, "create_task failed: {body}");
        body["task"]["id"].as_str().unwrap().to_string()
    }

    /// Claim a task and return the lease epoch.
    pub async fn claim(&self, task_id: &str, agent: &str, ttl_ms: u64) -> u64 {
        let (status, body) = self
            .post(
                &format!("/v1/tasks/{task_id}/claim"),
                serde_json::json!({ "agentId": agent, "ttlMs": ttl_ms }),
            )
            .await;
        assert_eq!(status, 200, "claim failed: {body}");
        body["lease"]["epoch"].as_u64().unwrap()
    }
}

async fn decode(response: reqwest::Response) -> (u16, serde_json::Value) {
    let status = response.status().as_u16();
    let body = response
        .json::<serde_json::Value>()
        .await
        .unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn error_code(body: &serde_json::Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
