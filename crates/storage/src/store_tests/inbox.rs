// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn task_events_broadcast_to_every_team_agent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.create_team(team_of_two()).await.unwrap();

    let task = create_simple_task(&store, "build").await;
    store
        .claim_task(&task.id, &AgentId::new("worker_a"), Some(60_000))
        .await
        .unwrap();

    // The actor is not excluded from task broadcasts
    for agent in ["worker_a", "worker_b"] {
        let page = store.fetch_inbox(&AgentId::new(agent), None).unwrap();
        assert_eq!(page.events.len(), 1, "missing event for {agent}");
        assert_eq!(page.events[0].kind, InboxEventKind::TaskClaimed);
        assert_eq!(
            page.events[0].summary,
            "Task task-0001 claimed by worker_a"
        );
    }
}

#[tokio::test]
async fn completion_events_carry_the_finalizer() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.create_team(team_of_two()).await.unwrap();
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    let page = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    let last = page.events.last().unwrap();
    assert_eq!(last.kind, InboxEventKind::TaskCompleted);
    assert_eq!(last.summary, "Task task-0001 completed by worker_a");
}

#[tokio::test]
async fn thread_messages_reach_participants_but_not_the_author() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(StartThread {
            title: "design".to_string(),
            participants: vec![AgentId::new("worker_a"), AgentId::new("worker_b")],
            task_id: None,
            originator: AgentId::new("lead"),
        })
        .await
        .unwrap();
    store
        .post_message(&thread.id, &AgentId::new("worker_a"), "long body\nline 2")
        .await
        .unwrap();

    let a = store.fetch_inbox(&AgentId::new("worker_a"), None).unwrap();
    assert!(a.events.is_empty());

    let b = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    assert_eq!(b.events.len(), 1);
    let event = &b.events[0];
    assert_eq!(event.kind, InboxEventKind::ThreadMessage);
    assert!(!event.summary.contains('\n'));
    assert_eq!(event.content.as_deref(), Some("long body\nline 2"));

    let lead = store.fetch_inbox(&AgentId::new("lead"), None).unwrap();
    assert_eq!(lead.events.len(), 1);
}

#[tokio::test]
async fn message_summaries_are_capped_at_120_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let thread = store
        .start_thread(StartThread {
            title: "design".to_string(),
            participants: vec![AgentId::new("worker_b")],
            task_id: None,
            originator: AgentId::new("lead"),
        })
        .await
        .unwrap();
    let body = "x".repeat(500);
    store
        .post_message(&thread.id, &AgentId::new("lead"), &body)
        .await
        .unwrap();

    let page = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    assert_eq!(page.events[0].summary.len(), 120);
}

#[tokio::test]
async fn cursors_advance_and_pages_resume_from_since() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.create_team(team_of_two()).await.unwrap();
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    let first = store.fetch_inbox(&AgentId::new("worker_b"), None).unwrap();
    assert_eq!(first.events.len(), 2);
    assert_eq!(first.next_since, 2);

    let rest = store
        .fetch_inbox(&AgentId::new("worker_b"), Some(first.next_since))
        .unwrap();
    assert!(rest.events.is_empty());
    assert_eq!(rest.next_since, first.next_since);
}

#[tokio::test]
async fn fetch_inbox_validates_the_agent_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let err = store.fetch_inbox(&AgentId::new("bad agent"), None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAgentId);
}

#[tokio::test]
async fn unknown_agents_get_an_empty_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let page = store.fetch_inbox(&AgentId::new("newcomer"), Some(7)).unwrap();
    assert!(page.events.is_empty());
    assert_eq!(page.next_since, 7);
}
