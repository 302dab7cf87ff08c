// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::MetadataExt;

fn test_config(root: &std::path::Path) -> Config {
    Config {
        workspace_root: root.to_owned(),
        team_id: TeamId::new("alpha"),
        port: 0,
        token: None,
    }
}

#[tokio::test]
async fn startup_scaffolds_and_publishes_the_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let handle = startup(&test_config(dir.path())).await.unwrap();

    let team_dir = dir.path().join("alpha");
    assert!(team_dir.join("tasks").is_dir());
    assert!(team_dir.join(".teamd.lock").is_file());

    let runtime = team_dir.join("runtime.json");
    let descriptor: RuntimeDescriptor =
        serde_json::from_slice(&fs::read(&runtime).unwrap()).unwrap();
    assert_eq!(descriptor.url, handle.url());
    assert_eq!(descriptor.token, handle.token());
    assert_eq!(descriptor.pid, std::process::id());
    assert_eq!(fs::metadata(&runtime).unwrap().mode() & 0o777, 0o600);

    handle.shutdown().await;
}

#[tokio::test]
async fn minted_tokens_are_256_bit_hex_and_unique() {
    let dir = tempfile::tempdir().unwrap();
    let a = startup(&test_config(dir.path())).await.unwrap();
    let token = a.token().to_string();
    assert_eq!(token.len(), 64);
    assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
    a.shutdown().await;

    let b = startup(&test_config(dir.path())).await.unwrap();
    assert_ne!(b.token(), token);
    b.shutdown().await;
}

#[tokio::test]
async fn supplied_token_is_used_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.token = Some("sekrit".to_string());

    let handle = startup(&config).await.unwrap();
    assert_eq!(handle.token(), "sekrit");
    handle.shutdown().await;
}

#[tokio::test]
async fn second_startup_fails_while_the_lock_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let first = startup(&config).await.unwrap();

    let err = startup(&config).await.unwrap_err();
    assert!(matches!(err, LifecycleError::LockHeld { .. }));
    let message = err.to_string();
    assert!(message.contains(".teamd.lock"));

    first.shutdown().await;
}

#[tokio::test]
async fn stale_lock_from_a_dead_pid_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let team_dir = dir.path().join("alpha");
    fs::create_dir_all(&team_dir).unwrap();
    fs::write(
        team_dir.join(".teamd.lock"),
        // pid far above any real pid on the test host
        format!(
            "{{\"pid\":999999,\"startedAt\":\"{}\",\"schemaVersion\":1}}\n",
            Utc::now().to_rfc3339()
        ),
    )
    .unwrap();

    let handle = startup(&test_config(dir.path())).await.unwrap();

    let payload: serde_json::Value =
        serde_json::from_slice(&fs::read(team_dir.join(".teamd.lock")).unwrap()).unwrap();
    assert_eq!(payload["pid"], std::process::id());

    handle.shutdown().await;
}

#[tokio::test]
async fn lock_held_by_a_live_pid_is_not_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let team_dir = dir.path().join("alpha");
    fs::create_dir_all(&team_dir).unwrap();
    fs::write(
        team_dir.join(".teamd.lock"),
        format!(
            "{{\"pid\":{},\"startedAt\":\"{}\",\"schemaVersion\":1}}\n",
            std::process::id(),
            Utc::now().to_rfc3339()
        ),
    )
    .unwrap();

    let err = startup(&test_config(dir.path())).await.unwrap_err();
    assert!(matches!(err, LifecycleError::LockHeld { pid: Some(_), .. }));
}

#[tokio::test]
async fn corrupt_lock_payload_counts_as_stale() {
    let dir = tempfile::tempdir().unwrap();
    let team_dir = dir.path().join("alpha");
    fs::create_dir_all(&team_dir).unwrap();
    fs::write(team_dir.join(".teamd.lock"), b"").unwrap();

    let handle = startup(&test_config(dir.path())).await.unwrap();
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_the_lock_and_descriptor_for_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let first = startup(&config).await.unwrap();
    first.shutdown().await;

    let team_dir = dir.path().join("alpha");
    assert!(!team_dir.join(".teamd.lock").exists());
    assert!(!team_dir.join("runtime.json").exists());

    let second = startup(&config).await.unwrap();
    second.shutdown().await;
}
