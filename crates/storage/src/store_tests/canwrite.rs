// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration as StdDuration;

async fn claimed_task_with_resources(store: &Store, agent: &AgentId, resources: &[&str]) -> Task {
    let mut req = create_request("build");
    req.resources = resources.iter().map(|r| r.to_string()).collect();
    let task = store.create_task(req).await.unwrap().task;
    store.claim_task(&task.id, agent, Some(60_000)).await.unwrap()
}

#[tokio::test]
async fn allows_the_holder_inside_a_leased_resource() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");
    claimed_task_with_resources(&store, &agent, &["src/api"]).await;

    let decision = store.can_write(&agent, "src/api/handler.rs");
    assert!(decision.allow);
    assert_eq!(decision.reason, "lease_active_for_resource");

    // Exact match counts too
    assert!(store.can_write(&agent, "src/api").allow);
}

#[tokio::test]
async fn denies_paths_outside_leased_resources() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");
    claimed_task_with_resources(&store, &agent, &["src/api"]).await;

    let decision = store.can_write(&agent, "docs/readme.md");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "no_active_lease_for_path");

    // A sibling with the resource as a string prefix is not covered
    assert!(!store.can_write(&agent, "src/apix/file.rs").allow);
}

#[tokio::test]
async fn denies_other_agents() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    claimed_task_with_resources(&store, &AgentId::new("worker_a"), &["src"]).await;

    let decision = store.can_write(&AgentId::new("worker_b"), "src/lib.rs");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "no_active_lease_for_path");
}

#[tokio::test]
async fn denies_after_lease_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let mut req = create_request("build");
    req.resources = vec!["src".to_string()];
    let task = store.create_task(req).await.unwrap().task;
    store.claim_task(&task.id, &agent, Some(25)).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let decision = store.can_write(&agent, "src/lib.rs");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "no_active_lease_for_path");
}

#[tokio::test]
async fn traversal_is_denied_with_a_structured_reason() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");
    claimed_task_with_resources(&store, &agent, &["src"]).await;

    let decision = store.can_write(&agent, "src/../../etc/passwd");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "path_traversal_denied");

    let decision = store.can_write(&agent, "");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "invalid_path");
}

#[tokio::test]
async fn symlink_escape_is_denied() {
    let outside = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");
    claimed_task_with_resources(&store, &agent, &["exit"]).await;

    std::os::unix::fs::symlink(outside.path(), dir.path().join("exit")).unwrap();

    let decision = store.can_write(&agent, "exit/file.txt");
    assert!(!decision.allow);
    assert_eq!(decision.reason, "path_traversal_denied");
}

#[tokio::test]
async fn completed_tasks_grant_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = claimed_task_with_resources(&store, &agent, &["src"]).await;
    store
        .finalize_task(&task.id, &agent, task.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    assert!(!store.can_write(&agent, "src/lib.rs").allow);
}
