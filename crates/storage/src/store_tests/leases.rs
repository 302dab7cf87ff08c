// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[tokio::test]
async fn claim_increments_epoch_and_installs_lease() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(5_000)).await.unwrap();

    assert_eq!(claimed.status, TaskStatus::InProgress);
    assert_eq!(claimed.epoch, 1);
    assert_eq!(claimed.owner.as_ref().unwrap(), &agent);
    let lease = claimed.lease.unwrap();
    assert_eq!(lease.holder, agent);
    assert_eq!(lease.epoch, 1);
    assert!(claimed.started_at.is_some());
}

#[tokio::test]
async fn second_claim_conflicts_while_lease_is_live() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let task = create_simple_task(&store, "build").await;
    store
        .claim_task(&task.id, &AgentId::new("worker_a"), Some(60_000))
        .await
        .unwrap();

    let err = store
        .claim_task(&task.id, &AgentId::new("worker_b"), Some(60_000))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotClaimable);
}

#[tokio::test]
async fn blocked_task_is_not_claimable() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let dep = create_simple_task(&store, "dep").await;
    let mut req = create_request("dependent");
    req.deps = vec![dep.id];
    let blocked = store.create_task(req).await.unwrap().task;

    let err = store
        .claim_task(&blocked.id, &AgentId::new("worker_a"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotClaimable);
}

#[tokio::test]
async fn expired_lease_resets_and_reclaim_bumps_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let task = create_simple_task(&store, "build").await;
    let first = store
        .claim_task(&task.id, &AgentId::new("worker_a"), Some(25))
        .await
        .unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let second = store
        .claim_task(&task.id, &AgentId::new("worker_b"), Some(60_000))
        .await
        .unwrap();
    assert!(second.epoch > first.epoch);
    assert_eq!(second.lease.unwrap().holder, "worker_b");
}

#[tokio::test]
async fn renew_extends_a_live_lease() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    let before = claimed.lease.as_ref().unwrap().expires_at;

    let renewed = store
        .renew_task(&task.id, &agent, claimed.epoch, Some(120_000))
        .await
        .unwrap();
    assert!(renewed.lease.unwrap().expires_at > before);
}

#[tokio::test]
async fn renew_after_expiry_is_rejected_even_for_the_holder() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(25)).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let err = store
        .renew_task(&task.id, &agent, claimed.epoch, Some(60_000))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LeaseExpired);
}

#[tokio::test]
async fn finalize_requires_matching_holder() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let task = create_simple_task(&store, "build").await;
    let claimed = store
        .claim_task(&task.id, &AgentId::new("worker_a"), Some(60_000))
        .await
        .unwrap();

    let err = store
        .finalize_task(
            &task.id,
            &AgentId::new("worker_b"),
            claimed.epoch,
            TaskOutcome::Completed,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LeaseHolderMismatch);
}

#[tokio::test]
async fn finalize_with_stale_epoch_is_fenced_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let task = create_simple_task(&store, "build").await;
    let stale = store
        .claim_task(&task.id, &AgentId::new("worker_a"), Some(25))
        .await
        .unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    // Another agent claims after expiry; the first holder's epoch is stale
    let fresh = store
        .claim_task(&task.id, &AgentId::new("worker_b"), Some(60_000))
        .await
        .unwrap();

    let err = store
        .finalize_task(
            &task.id,
            &AgentId::new("worker_b"),
            stale.epoch,
            TaskOutcome::Completed,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EpochMismatch);

    // The fresh token still works
    store
        .finalize_task(
            &task.id,
            &AgentId::new("worker_b"),
            fresh.epoch,
            TaskOutcome::Completed,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn finalize_after_expiry_is_rejected_even_with_matching_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(25)).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let err = store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LeaseExpired);
}

#[tokio::test]
async fn complete_clears_the_lease_and_stamps_the_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    let done = store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap();

    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.lease.is_none());
    assert!(done.completed_at.is_some());
    assert!(done.holds_lease_invariants());
}

#[tokio::test]
async fn finalize_on_a_terminal_task_is_not_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let claimed = store.claim_task(&task.id, &agent, Some(60_000)).await.unwrap();
    store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Failed)
        .await
        .unwrap();

    let err = store
        .finalize_task(&task.id, &agent, claimed.epoch, TaskOutcome::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TaskNotInProgress);
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open_store(&dir));

    let task = create_simple_task(&store, "build").await;

    let a = {
        let store = Arc::clone(&store);
        let id = task.id.clone();
        tokio::spawn(async move {
            store
                .claim_task(&id, &AgentId::new("worker_a"), Some(60_000))
                .await
        })
    };
    let b = {
        let store = Arc::clone(&store);
        let id = task.id.clone();
        tokio::spawn(async move {
            store
                .claim_task(&id, &AgentId::new("worker_b"), Some(60_000))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        loser.as_ref().unwrap_err().code(),
        ErrorCode::TaskNotClaimable
    );
}

#[tokio::test]
async fn epochs_increase_across_claim_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let agent = AgentId::new("worker_a");

    let task = create_simple_task(&store, "build").await;
    let mut last_epoch = 0;
    for _ in 0..3 {
        let claimed = store.claim_task(&task.id, &agent, Some(25)).await.unwrap();
        assert!(claimed.epoch > last_epoch);
        last_epoch = claimed.epoch;
        tokio::time::sleep(StdDuration::from_millis(50)).await;
    }
}
