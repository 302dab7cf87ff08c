// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit-code and output contracts of the admin CLI.

use crate::prelude::*;
use assert_cmd::Command;

fn teamctl() -> Command {
    let mut cmd = Command::cargo_bin("teamctl").unwrap();
    // Isolate from the developer's real environment
    for var in ["TEAM_WORKSPACE_ROOT", "TEAM_ID", "AGENT_ID", "TEAMD_URL", "TEAMD_TOKEN", "TEAMD_TOKEN_FILE"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn status_fails_cleanly_without_a_daemon() {
    let dir = tempfile::tempdir().unwrap();
    teamctl()
        .args(["daemon", "status"])
        .env("TEAM_WORKSPACE_ROOT", dir.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_commands_exit_one() {
    teamctl().arg("frobnicate").assert().failure().code(1);
}

#[test]
fn help_exits_zero() {
    teamctl().arg("--help").assert().success();
}

#[test]
fn agent_env_prints_exports_from_explicit_env() {
    let output = teamctl()
        .args(["agent", "env"])
        .env("TEAMD_URL", "http://127.0.0.1:7777")
        .env("TEAMD_TOKEN", "tok")
        .env("TEAM_ID", TEAM)
        .env("AGENT_ID", "worker_a")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    assert!(stdout.contains("export TEAMD_URL=http://127.0.0.1:7777"));
    assert!(stdout.contains("export TEAMD_TOKEN=tok"));
    assert!(stdout.contains("export AGENT_ID=worker_a"));
}

#[tokio::test]
async fn tasks_list_shows_live_state() {
    let h = harness().await;
    let task = h.create_task("visible from the cli").await;
    h.claim(&task, "worker_a", 60_000).await;

    let assert = tokio::task::spawn_blocking({
        let url = h.handle.url().to_string();
        let token = h.handle.token().to_string();
        move || {
            teamctl()
                .args(["tasks", "list"])
                .env("TEAMD_URL", url)
                .env("TEAMD_TOKEN", token)
                .env("TEAM_ID", TEAM)
                .assert()
                .success()
                .get_output()
                .stdout
                .clone()
        }
    })
    .await
    .unwrap();

    let stdout = String::from_utf8(assert).unwrap();
    assert!(stdout.contains(&task));
    assert!(stdout.contains("in_progress"));
    assert!(stdout.contains("worker_a"));

    h.handle.shutdown().await;
}
