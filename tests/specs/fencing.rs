// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease and epoch fencing end to end.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn expired_leases_fence_out_the_old_holder() {
    let h = harness().await;
    let task = h.create_task("build").await;

    let epoch = h.claim(&task, "worker_a", 25).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let (status, body) = h
        .post(
            &format!("/v1/tasks/{task}/complete"),
            json!({ "agentId": "worker_a", "epoch": epoch }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(error_code(&body), "LEASE_EXPIRED");

    // Re-claim mints a strictly greater epoch
    let next_epoch = h.claim(&task, "worker_a", 60_000).await;
    assert!(next_epoch > epoch);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn stale_epochs_are_rejected_even_for_the_right_agent() {
    let h = harness().await;
    let task = h.create_task("build").await;

    let stale = h.claim(&task, "worker_a", 25).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let fresh = h.claim(&task, "worker_a", 60_000).await;
    assert!(fresh > stale);

    let (status, body) = h
        .post(
            &format!("/v1/tasks/{task}/complete"),
            json!({ "agentId": "worker_a", "epoch": stale }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(error_code(&body), "EPOCH_MISMATCH");

    let (status, _) = h
        .post(
            &format!("/v1/tasks/{task}/complete"),
            json!({ "agentId": "worker_a", "epoch": fresh }),
        )
        .await;
    assert_eq!(status, 200);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn racing_claims_sort_to_one_winner_and_one_conflict() {
    let h = harness().await;
    let task = h.create_task("contended").await;

    let claim_path = format!("/v1/tasks/{task}/claim");
    let a = h.post(
        &claim_path,
        json!({ "agentId": "worker_a", "ttlMs": 60000 }),
    );
    let b = h.post(
        &claim_path,
        json!({ "agentId": "worker_b", "ttlMs": 60000 }),
    );
    let ((status_a, _), (status_b, _)) = tokio::join!(a, b);

    let mut statuses = [status_a, status_b];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn renewing_holds_the_lease_open() {
    let h = harness().await;
    let task = h.create_task("long haul").await;

    let epoch = h.claim(&task, "worker_a", 60_000).await;
    let (status, body) = h
        .post(
            &format!("/v1/tasks/{task}/renew"),
            json!({ "agentId": "worker_a", "epoch": epoch, "ttlMs": 120000 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["lease"]["epoch"].as_u64().unwrap(), epoch);

    // A different agent cannot renew someone else's lease
    let (status, body) = h
        .post(
            &format!("/v1/tasks/{task}/renew"),
            json!({ "agentId": "worker_b", "epoch": epoch, "ttlMs": 120000 }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(error_code(&body), "LEASE_HOLDER_MISMATCH");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn lease_invariant_holds_on_every_observed_read() {
    let h = harness().await;
    let task = h.create_task("watched").await;

    let assert_invariant = |body: &serde_json::Value| {
        let task = &body["task"];
        let in_progress = task["status"] == "in_progress";
        let has_lease = !task["lease"].is_null();
        assert_eq!(in_progress, has_lease, "lease iff in_progress: {task}");
    };

    let (_, body) = h.get(&format!("/v1/tasks/{task}")).await;
    assert_invariant(&body);

    let epoch = h.claim(&task, "worker_a", 60_000).await;
    let (_, body) = h.get(&format!("/v1/tasks/{task}")).await;
    assert_invariant(&body);

    h.post(
        &format!("/v1/tasks/{task}/complete"),
        json!({ "agentId": "worker_a", "epoch": epoch }),
    )
    .await;
    let (_, body) = h.get(&format!("/v1/tasks/{task}")).await;
    assert_invariant(&body);
    assert_eq!(body["task"]["status"], "completed");

    h.handle.shutdown().await;
}
