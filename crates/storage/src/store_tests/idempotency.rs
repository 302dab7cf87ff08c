// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn keyed_request(title: &str, key: &str) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        idempotency_key: Some(key.to_string()),
        ..CreateTask::default()
    }
}

#[tokio::test]
async fn repeated_key_returns_the_original_task() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let first = store
        .create_task(keyed_request("build", "create-task-1"))
        .await
        .unwrap();
    assert!(first.created);

    let second = store
        .create_task(keyed_request("build", "create-task-1"))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.task.id, first.task.id);
    assert_eq!(store.list_tasks().len(), 1);
}

#[tokio::test]
async fn first_payload_wins_on_divergent_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let first = store
        .create_task(keyed_request("original title", "k"))
        .await
        .unwrap();
    let second = store
        .create_task(keyed_request("different title", "k"))
        .await
        .unwrap();

    assert_eq!(second.task.id, first.task.id);
    assert_eq!(second.task.title, "original title");
    assert_eq!(store.list_tasks().len(), 1);
}

#[tokio::test]
async fn distinct_keys_mint_distinct_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let a = store.create_task(keyed_request("a", "k1")).await.unwrap();
    let b = store.create_task(keyed_request("b", "k2")).await.unwrap();
    assert_ne!(a.task.id, b.task.id);
}

#[tokio::test]
async fn keys_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open_store(&dir);
        store
            .create_task(keyed_request("build", "create-task-1"))
            .await
            .unwrap();
    }

    // Reopen from disk: the same key must map to the same task
    let store = open_store(&dir);
    let repeat = store
        .create_task(keyed_request("build", "create-task-1"))
        .await
        .unwrap();
    assert!(!repeat.created);
    assert_eq!(repeat.task.id, "task-0001");
    assert_eq!(store.list_tasks().len(), 1);
}
