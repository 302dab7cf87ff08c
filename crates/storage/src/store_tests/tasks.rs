// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn creates_tasks_with_minted_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let first = create_simple_task(&store, "first").await;
    let second = create_simple_task(&store, "second").await;

    assert_eq!(first.id, "task-0001");
    assert_eq!(second.id, "task-0002");
    assert_eq!(first.status, TaskStatus::Pending);
    assert_eq!(first.epoch, 0);
    assert!(first.lease.is_none());
}

#[tokio::test]
async fn rejects_empty_titles() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let err = store.create_task(create_request("  ")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTask);
}

#[tokio::test]
async fn rejects_unnormalizable_resources() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut req = create_request("task");
    req.resources = vec!["src/../..".to_string()];
    let err = store.create_task(req).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTask);
}

#[tokio::test]
async fn normalizes_and_dedupes_resources() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut req = create_request("task");
    req.resources = vec![
        "./src/api/".to_string(),
        "src/api".to_string(),
        "/docs".to_string(),
    ];
    let task = store.create_task(req).await.unwrap().task;
    assert_eq!(task.resources, vec!["src/api", "docs"]);
}

#[tokio::test]
async fn task_with_incomplete_dependency_is_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let dep = create_simple_task(&store, "dep").await;
    let mut req = create_request("dependent");
    req.deps = vec![dep.id.clone()];
    let task = store.create_task(req).await.unwrap().task;

    assert_eq!(task.status, TaskStatus::Blocked);
}

#[tokio::test]
async fn task_with_unknown_dependency_is_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut req = create_request("dependent");
    req.deps = vec![TaskId::new("task-9999")];
    let task = store.create_task(req).await.unwrap().task;

    assert_eq!(task.status, TaskStatus::Blocked);
}

#[tokio::test]
async fn task_with_completed_dependencies_starts_pending() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let dep = create_simple_task(&store, "dep").await;
    let agent = AgentId::new("worker_a");
    let claimed = store.claim_task(&dep.id, &agent, None).await.unwrap();
    store
        .finalize_task(&dep.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    let mut req = create_request("dependent");
    req.deps = vec![dep.id];
    let task = store.create_task(req).await.unwrap().task;
    assert_eq!(task.status, TaskStatus::Pending);
}

#[tokio::test]
async fn completion_unblocks_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let dep = create_simple_task(&store, "dep").await;
    let mut req = create_request("dependent");
    req.deps = vec![dep.id.clone()];
    let dependent = store.create_task(req).await.unwrap().task;
    assert_eq!(dependent.status, TaskStatus::Blocked);

    let claimed = store.claim_task(&dep.id, &agent, None).await.unwrap();
    store
        .finalize_task(&dep.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    assert_eq!(
        store.get_task(&dependent.id).unwrap().status,
        TaskStatus::Pending
    );
}

#[tokio::test]
async fn unblock_waits_for_the_last_outstanding_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let dep_a = create_simple_task(&store, "a").await;
    let dep_b = create_simple_task(&store, "b").await;
    let mut req = create_request("dependent");
    req.deps = vec![dep_a.id.clone(), dep_b.id.clone()];
    let dependent = store.create_task(req).await.unwrap().task;

    let claimed = store.claim_task(&dep_a.id, &agent, None).await.unwrap();
    store
        .finalize_task(&dep_a.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();
    assert_eq!(
        store.get_task(&dependent.id).unwrap().status,
        TaskStatus::Blocked
    );

    let claimed = store.claim_task(&dep_b.id, &agent, None).await.unwrap();
    store
        .finalize_task(&dep_b.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();
    assert_eq!(
        store.get_task(&dependent.id).unwrap().status,
        TaskStatus::Pending
    );
}

#[tokio::test]
async fn failure_does_not_unblock_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let dep = create_simple_task(&store, "dep").await;
    let mut req = create_request("dependent");
    req.deps = vec![dep.id.clone()];
    let dependent = store.create_task(req).await.unwrap().task;

    let claimed = store.claim_task(&dep.id, &agent, None).await.unwrap();
    store
        .finalize_task(&dep.id, &agent, claimed.epoch, TaskOutcome::Failed)
        .await
        .unwrap();

    assert_eq!(
        store.get_task(&dependent.id).unwrap().status,
        TaskStatus::Blocked
    );
}

#[tokio::test]
async fn get_task_reports_absence() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let err = store.get_task(&TaskId::new("task-0404")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn list_tasks_is_ordered_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    for title in ["a", "b", "c"] {
        create_simple_task(&store, title).await;
    }
    let ids: Vec<String> = store.list_tasks().iter().map(|t| t.id.to_string()).collect();
    assert_eq!(ids, vec!["task-0001", "task-0002", "task-0003"]);
}
