// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn reopen_recovers_tasks_threads_and_inboxes() {
    let dir = tempfile::tempdir().unwrap();
    let (task_id, thread_id, epoch) = {
        let store = open_store(&dir);
        store.create_team(team_of_two()).await.unwrap();
        let task = create_simple_task(&store, "build").await;
        let claimed = store
            .claim_task(&task.id, &AgentId::new("worker_a"), Some(60_000))
            .await
            .unwrap();
        let thread = store
            .start_thread(StartThread {
                title: "design".to_string(),
                participants: vec![AgentId::new("worker_b")],
                task_id: Some(task.id.clone()),
                originator: AgentId::new("worker_a"),
            })
            .await
            .unwrap();
        store
            .post_message(&thread.id, &AgentId::new("worker_a"), "hello")
            .await
            .unwrap();
        (task.id, thread.id, claimed.epoch)
    };

    let store = open_store(&dir);
    let task = store.get_task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.epoch, epoch);
    assert!(task.holds_lease_invariants());

    let tail = store.read_thread_tail(&thread_id, None).unwrap();
    assert_eq!(tail.messages.len(), 1);
    assert_eq!(tail.thread.task_id.as_ref().unwrap(), &task_id);

    // Inbox cursors survive and keep advancing after reopen
    let before = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    assert!(!before.events.is_empty());
    store
        .finalize_task(&task_id, &AgentId::new("worker_a"), epoch, TaskOutcome::Completed)
        .await
        .unwrap();
    let after = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    assert!(after.next_since > before.next_since);
}

#[tokio::test]
async fn minting_continues_from_disk_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open_store(&dir);
        create_simple_task(&store, "one").await;
        create_simple_task(&store, "two").await;
    }

    let store = open_store(&dir);
    let next = create_simple_task(&store, "three").await;
    assert_eq!(next.id, "task-0003");
}

#[tokio::test]
async fn audit_log_records_every_transition_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    let events: Vec<AuditEvent> = fsio::read_jsonl(&store.layout().audit_log()).unwrap();
    let kinds: Vec<AuditKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AuditKind::TaskCreated,
            AuditKind::TaskClaimed,
            AuditKind::TaskCompleted
        ]
    );
}
