// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: interrupted appends and restart idempotence.

use crate::prelude::*;
use serde_json::json;
use std::io::Write as _;

#[tokio::test]
async fn interrupted_thread_append_loses_only_the_fragment() {
    let dir = tempfile::tempdir().unwrap();

    let thread_id = {
        let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
        let http = reqwest::Client::new();

        let response = http
            .post(format!("{}/v1/threads", handle.url()))
            .bearer_auth(handle.token())
            .json(&json!({ "title": "design", "originator": "worker_a" }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let thread_id = body["thread"]["id"].as_str().unwrap().to_string();

        http.post(format!("{}/v1/threads/{thread_id}/messages", handle.url()))
            .bearer_auth(handle.token())
            .json(&json!({ "agentId": "worker_a", "body": "the real message" }))
            .send()
            .await
            .unwrap();

        // also leave a task on disk to prove task parsing survives
        http.post(format!("{}/v1/tasks", handle.url()))
            .bearer_auth(handle.token())
            .json(&json!({ "title": "survivor" }))
            .send()
            .await
            .unwrap();

        handle.shutdown().await;
        thread_id
    };

    // Crash-interrupted append: raw bytes, no trailing newline
    let log = dir
        .path()
        .join(TEAM)
        .join("threads")
        .join(format!("{thread_id}.jsonl"));
    let mut file = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
    file.write_all(b"{\"partial\":").unwrap();
    drop(file);

    let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
    let http = reqwest::Client::new();

    let response = http
        .get(format!("{}/v1/threads/{thread_id}/tail", handle.url()))
        .bearer_auth(handle.token())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let tail: serde_json::Value = response.json().await.unwrap();
    let messages = tail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], "the real message");

    let response = http
        .get(format!("{}/v1/tasks", handle.url()))
        .bearer_auth(handle.token())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let listing: serde_json::Value = response.json().await.unwrap();
    assert_eq!(listing["tasks"].as_array().unwrap().len(), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn restart_preserves_task_state_and_epochs() {
    let dir = tempfile::tempdir().unwrap();

    let (task_id, epoch) = {
        let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{}/v1/tasks", handle.url()))
            .bearer_auth(handle.token())
            .json(&json!({ "title": "durable" }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let task_id = body["task"]["id"].as_str().unwrap().to_string();

        let response = http
            .post(format!("{}/v1/tasks/{task_id}/claim", handle.url()))
            .bearer_auth(handle.token())
            .json(&json!({ "agentId": "worker_a", "ttlMs": 300000 }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let epoch = body["lease"]["epoch"].as_u64().unwrap();
        handle.shutdown().await;
        (task_id, epoch)
    };

    let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
    let http = reqwest::Client::new();

    // The lease survives the restart; the same fencing token finalizes it
    let response = http
        .post(format!("{}/v1/tasks/{task_id}/complete", handle.url()))
        .bearer_auth(handle.token())
        .json(&json!({ "agentId": "worker_a", "epoch": epoch }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["task"]["status"], "completed");

    handle.shutdown().await;
}
