// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;

fn start_request(title: &str, originator: &str, participants: &[&str]) -> StartThread {
    StartThread {
        title: title.to_string(),
        participants: participants.iter().map(|p| AgentId::new(*p)).collect(),
        task_id: None,
        originator: AgentId::new(originator),
    }
}

#[tokio::test]
async fn starts_threads_with_minted_ids_and_folded_originator() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(start_request("design", "lead", &["worker_a", "worker_a"]))
        .await
        .unwrap();

    assert_eq!(thread.id, "thread-0001");
    // originator folded in, duplicates removed
    assert_eq!(thread.participants, vec!["lead", "worker_a"]);
}

#[tokio::test]
async fn start_thread_validates_linked_task() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut req = start_request("design", "lead", &[]);
    req.task_id = Some(TaskId::new("task-0404"));
    let err = store.start_thread(req).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn posts_messages_and_reads_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(start_request("design", "lead", &["worker_a"]))
        .await
        .unwrap();
    for n in 0..5 {
        store
            .post_message(&thread.id, &AgentId::new("lead"), &format!("note {n}"))
            .await
            .unwrap();
    }

    let tail = store.read_thread_tail(&thread.id, Some(2)).unwrap();
    assert_eq!(tail.messages.len(), 2);
    assert_eq!(tail.messages[1].body, "note 4");
    assert!(tail.thread.updated_at >= tail.thread.created_at);
}

#[tokio::test]
async fn post_rejects_empty_bodies() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(start_request("design", "lead", &[]))
        .await
        .unwrap();
    let err = store
        .post_message(&thread.id, &AgentId::new("lead"), "  \n ")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidThreadMessage);
}

#[tokio::test]
async fn post_to_unknown_thread_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let err = store
        .post_message(&ThreadId::new("thread-0404"), &AgentId::new("lead"), "hi")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ThreadNotFound);
}

#[tokio::test]
async fn author_is_folded_into_participants_on_post() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(start_request("design", "lead", &[]))
        .await
        .unwrap();
    store
        .post_message(&thread.id, &AgentId::new("worker_a"), "joining in")
        .await
        .unwrap();

    let tail = store.read_thread_tail(&thread.id, None).unwrap();
    assert!(tail.thread.participants.iter().any(|p| p == "worker_a"));
}

#[tokio::test]
async fn tail_read_survives_a_crash_interrupted_append() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(start_request("design", "lead", &[]))
        .await
        .unwrap();
    store
        .post_message(&thread.id, &AgentId::new("lead"), "committed")
        .await
        .unwrap();

    // Simulate a crash mid-append: raw bytes with no trailing newline
    let log = store.layout().thread_log(&thread.id);
    let mut file = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
    file.write_all(b"{\"partial\":").unwrap();
    drop(file);

    let tail = store.read_thread_tail(&thread.id, None).unwrap();
    assert_eq!(tail.messages.len(), 1);
    assert_eq!(tail.messages[0].body, "committed");
}

#[tokio::test]
async fn search_matches_titles_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store
        .start_thread(start_request("API design", "lead", &[]))
        .await
        .unwrap();
    store
        .start_thread(start_request("retro notes", "lead", &[]))
        .await
        .unwrap();

    let hits = store.search_threads("api");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "API design");
    assert_eq!(store.search_threads("").len(), 2);
}

#[tokio::test]
async fn links_threads_to_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let task = create_simple_task(&store, "build").await;
    let thread = store
        .start_thread(start_request("design", "lead", &[]))
        .await
        .unwrap();

    let linked = store.link_thread(&thread.id, &task.id).await.unwrap();
    assert_eq!(linked.task_id.unwrap(), task.id);

    let err = store
        .link_thread(&thread.id, &TaskId::new("task-0404"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotFound);
}
