// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance locking and stale-holder reclamation.

use crate::prelude::*;

#[tokio::test]
async fn stale_locks_are_reclaimed_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let team_dir = dir.path().join(TEAM);
    std::fs::create_dir_all(&team_dir).unwrap();
    std::fs::write(
        team_dir.join(".teamd.lock"),
        b"{\"pid\":999999,\"startedAt\":\"2026-01-01T00:00:00Z\",\"schemaVersion\":1}\n",
    )
    .unwrap();

    let handle = teamd_daemon::startup(&config_for(&dir)).await.unwrap();

    let payload: serde_json::Value = serde_json::from_slice(
        &std::fs::read(team_dir.join(".teamd.lock")).unwrap(),
    )
    .unwrap();
    assert_eq!(payload["pid"], std::process::id());

    handle.shutdown().await;
}

#[tokio::test]
async fn a_second_daemon_cannot_start_on_the_same_team() {
    let h = harness().await;

    let err = teamd_daemon::startup(&config_for(&h.dir)).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains(".teamd.lock"), "unactionable: {message}");
    assert!(message.contains("already running"), "unactionable: {message}");

    h.handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_lets_a_successor_start_immediately() {
    let dir = tempfile::tempdir().unwrap();

    let first = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
    first.shutdown().await;

    let second = teamd_daemon::startup(&config_for(&dir)).await.unwrap();
    second.shutdown().await;
}
