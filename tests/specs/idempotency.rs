// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent task creation over the wire.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn repeated_idempotency_keys_return_the_same_task() {
    let h = harness().await;
    let body = json!({ "title": "build", "description": "the one true build" });

    let (status, first) = h
        .post_with_header("/v1/tasks", ("Idempotency-Key", "create-task-1"), body.clone())
        .await;
    assert_eq!(status, 201);
    assert_eq!(first["task"]["id"], "task-0001");
    assert_eq!(first["created"], true);

    let (status, second) = h
        .post_with_header("/v1/tasks", ("Idempotency-Key", "create-task-1"), body)
        .await;
    assert_eq!(status, 200);
    assert_eq!(second["task"]["id"], "task-0001");
    assert_eq!(second["created"], false);

    let (_, listing) = h.get("/v1/tasks").await;
    assert_eq!(listing["tasks"].as_array().unwrap().len(), 1);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn idempotency_keys_survive_a_daemon_restart() {
    let dir = tempfile::tempdir().unwrap();
    let body = json!({ "title": "build" });

    let first_id = {
        let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{}/v1/tasks", handle.url()))
            .bearer_auth(handle.token())
            .header("Idempotency-Key", "create-task-1")
            .json(&body)
            .send()
            .await
            .unwrap();
        let value: serde_json::Value = response.json().await.unwrap();
        let id = value["task"]["id"].as_str().unwrap().to_string();
        handle.shutdown().await;
        id
    };

    let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
    let http = reqwest::Client::new();
    let response = http
        .post(format!("{}/v1/tasks", handle.url()))
        .bearer_auth(handle.token())
        .header("Idempotency-Key", "create-task-1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let value: serde_json::Value = response.json().await.unwrap();
    assert_eq!(value["task"]["id"], first_id.as_str());
    assert_eq!(value["created"], false);
    handle.shutdown().await;
}
