// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guard client behavior against a live daemon.

use crate::prelude::*;
use serde_json::json;
use teamd_guard::{discover, gate_tool, EnvSnapshot, GateDecision, GuardClient};

fn env_for(h: &Harness, agent: &str) -> EnvSnapshot {
    EnvSnapshot {
        workspace_root: Some(h.dir.path().to_owned()),
        team_id: Some(TEAM.to_string()),
        agent_id: Some(agent.to_string()),
        url: Some(h.handle.url().to_string()),
        token: Some(h.handle.token().to_string()),
        ..EnvSnapshot::default()
    }
}

#[tokio::test]
async fn writes_without_a_lease_are_blocked_with_a_lease_reason() {
    let h = harness().await;
    h.create_task("unclaimed").await;

    let decision = gate_tool(
        &env_for(&h, "worker_a"),
        "write",
        &json!({ "file_path": "src/main.rs" }),
        true,
    )
    .await;

    let GateDecision::Block { reason } = decision else {
        panic!("expected a block");
    };
    assert!(reason.contains("lease"), "reason must mention the lease: {reason}");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn a_live_lease_over_the_resource_allows_the_write() {
    let h = harness().await;

    let (_, body) = h
        .post(
            "/v1/tasks",
            json!({ "title": "api work", "resources": ["src/api"] }),
        )
        .await;
    let task = body["task"]["id"].as_str().unwrap().to_string();
    h.claim(&task, "worker_a", 60_000).await;

    let env = env_for(&h, "worker_a");
    let allowed = gate_tool(&env, "edit", &json!({ "file_path": "src/api/mod.rs" }), true).await;
    assert_eq!(allowed, GateDecision::Allow);

    // bash with an explicit path outside the lease is still blocked
    let blocked = gate_tool(&env, "bash", &json!({ "path": "docs" }), true).await;
    assert!(matches!(blocked, GateDecision::Block { .. }));

    h.handle.shutdown().await;
}

#[tokio::test]
async fn unreachable_daemons_deny_rather_than_allow() {
    let h = harness().await;
    let mut env = env_for(&h, "worker_a");
    env.url = Some("http://127.0.0.1:9".to_string());

    let client = GuardClient::new(discover(&env).unwrap());
    let decision = client.can_write("src/lib.rs").await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "can_write_check_failed");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn discovery_falls_back_to_the_runtime_descriptor() {
    let h = harness().await;

    // Only the workspace root is known; url and token come from the scan
    let env = EnvSnapshot {
        workspace_root: Some(h.dir.path().to_owned()),
        agent_id: Some("worker_a".to_string()),
        ..EnvSnapshot::default()
    };
    let discovery = discover(&env).unwrap();
    assert_eq!(discovery.url, h.handle.url());
    assert_eq!(discovery.token, h.handle.token());

    let client = GuardClient::new(discovery);
    let decision = client.can_write("anything.txt").await;
    assert_eq!(decision.reason, "no_active_lease_for_path");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn inbox_polling_emits_compact_single_lines() {
    let h = harness().await;
    h.post(
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

    let task = h.create_task("observable").await;
    let epoch = h.claim(&task, "worker_a", 60_000).await;
    h.post(
        &format!("/v1/tasks/{task}/complete"),
        json!({ "agentId": "worker_a", "epoch": epoch }),
    )
    .await;

    let client = GuardClient::new(discover(&env_for(&h, "worker_b")).unwrap());
    let (lines, next) = client.poll_inbox(0).await.unwrap();
    assert_eq!(
        lines,
        vec![
            format!("INBOX: task_claimed {task} by worker_a"),
            format!("INBOX: task_completed {task} by worker_a"),
        ]
    );
    assert!(lines.iter().all(|l| !l.contains('\n')));
    assert_eq!(next, 2);

    // Nothing new after the cursor
    let (lines, next_again) = client.poll_inbox(next).await.unwrap();
    assert!(lines.is_empty());
    assert_eq!(next_again, next);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn mutation_wrappers_drive_the_full_task_cycle() {
    let h = harness().await;
    let client = GuardClient::new(discover(&env_for(&h, "worker_a")).unwrap());

    let created = client
        .create_task(
            teamd_guard::NewTask {
                title: "from the guard".to_string(),
                resources: vec!["src".to_string()],
                ..teamd_guard::NewTask::default()
            },
            Some("guard-key-1"),
        )
        .await
        .unwrap();
    assert!(created.created);

    let claimed = client.claim_task(&created.task.id, Some(60_000)).await.unwrap();
    let epoch = claimed.epoch;

    let renewed = client
        .renew_task(&claimed.id, epoch, Some(120_000))
        .await
        .unwrap();
    assert_eq!(renewed.epoch, epoch);

    let thread = client
        .start_thread("progress", &["worker_b"], Some(&claimed.id))
        .await
        .unwrap();
    client.post_message(&thread.id, "halfway there").await.unwrap();

    let done = client.complete_task(&claimed.id, epoch).await.unwrap();
    assert_eq!(done.status.to_string(), "completed");

    h.handle.shutdown().await;
}
