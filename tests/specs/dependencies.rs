// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency blocking and automatic unblock.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn dependents_block_until_the_last_dependency_completes() {
    let h = harness().await;

    let dep = h.create_task("foundation").await;
    let (status, body) = h
        .post(
            "/v1/tasks",
            json!({ "title": "dependent", "deps": [dep] }),
        )
        .await;
    assert_eq!(status, 201);
    let dependent = body["task"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["task"]["status"], "blocked");

    let epoch = h.claim(&dep, "worker_a", 60_000).await;
    let (status, _) = h
        .post(
            &format!("/v1/tasks/{dep}/complete"),
            json!({ "agentId": "worker_a", "epoch": epoch }),
        )
        .await;
    assert_eq!(status, 200);

    let (_, body) = h.get(&format!("/v1/tasks/{dependent}")).await;
    assert_eq!(body["task"]["status"], "pending");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn failing_a_dependency_leaves_dependents_blocked() {
    let h = harness().await;

    let dep = h.create_task("foundation").await;
    let (_, body) = h
        .post(
            "/v1/tasks",
            json!({ "title": "dependent", "deps": [dep] }),
        )
        .await;
    let dependent = body["task"]["id"].as_str().unwrap().to_string();

    let epoch = h.claim(&dep, "worker_a", 60_000).await;
    h.post(
        &format!("/v1/tasks/{dep}/fail"),
        json!({ "agentId": "worker_a", "epoch": epoch }),
    )
    .await;

    let (_, body) = h.get(&format!("/v1/tasks/{dependent}")).await;
    assert_eq!(body["task"]["status"], "blocked");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn completion_broadcasts_to_team_inboxes() {
    let h = harness().await;

    let (status, _) = h
        .post(
            "/v1/teams",
            json!({
                "schemaVersion": 1,
                "id": TEAM,
                "agents": [
                    { "id": "worker_a", "role": "implementer" },
                    { "id": "worker_b", "role": "reviewer" },
                ],
            }),
        )
        .await;
    assert_eq!(status, 201);

    let task = h.create_task("observable").await;
    let epoch = h.claim(&task, "worker_a", 60_000).await;
    h.post(
        &format!("/v1/tasks/{task}/complete"),
        json!({ "agentId": "worker_a", "epoch": epoch }),
    )
    .await;

    let (status, body) = h.get("/v1/inbox?agentId=worker_b").await;
    assert_eq!(status, 200);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "task_claimed");
    assert_eq!(events[1]["type"], "task_completed");
    assert_eq!(
        events[1]["summary"],
        format!("Task {task} completed by worker_a")
    );

    h.handle.shutdown().await;
}
