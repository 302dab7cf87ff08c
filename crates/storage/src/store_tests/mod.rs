// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod canwrite;
mod idempotency;
mod inbox;
mod leases;
mod recovery;
mod tasks;
mod threads;

use super::*;
use tempfile::TempDir;

/// Open a store in a fresh scaffolded workspace; the TempDir must be kept
/// alive for the duration of the test.
pub(super) fn open_store(dir: &TempDir) -> Store {
    open_store_for_team(dir, "alpha")
}

pub(super) fn open_store_for_team(dir: &TempDir, team_id: &str) -> Store {
    let layout = TeamLayout::resolve(dir.path(), &TeamId::new(team_id)).unwrap();
    layout.scaffold().unwrap();
    Store::open(layout).unwrap()
}

pub(super) fn create_request(title: &str) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        ..CreateTask::default()
    }
}

pub(super) async fn create_simple_task(store: &Store, title: &str) -> Task {
    store.create_task(create_request(title)).await.unwrap().task
}

pub(super) fn team_of_two() -> Team {
    Team {
        schema_version: SCHEMA_VERSION,
        id: TeamId::new("alpha"),
        agents: vec![
            teamd_core::AgentSpec {
                id: AgentId::new("worker_a"),
                role: "implementer".to_string(),
                model: None,
            },
            teamd_core::AgentSpec {
                id: AgentId::new("worker_b"),
                role: "reviewer".to_string(),
                model: Some("fast".to_string()),
            },
        ],
        budget: None,
    }
}

#[tokio::test]
async fn create_team_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let (team, created) = store.create_team(team_of_two()).await.unwrap();
    assert!(created);
    assert_eq!(team.agents.len(), 2);

    // Second create is a no-op returning the stored record
    let mut altered = team_of_two();
    altered.agents.clear();
    let (team, created) = store.create_team(altered).await.unwrap();
    assert!(!created);
    assert_eq!(team.agents.len(), 2);
}

#[tokio::test]
async fn create_team_rejects_foreign_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut team = team_of_two();
    team.id = TeamId::new("beta");
    let err = store.create_team(team).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTeamId);
}

#[test]
fn ensure_team_rejects_unknown_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    assert!(store.ensure_team(&TeamId::new("alpha")).is_ok());
    let err = store.ensure_team(&TeamId::new("beta")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TeamNotFound);
}

#[test]
fn team_defaults_to_empty_when_file_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let team = store.team();
    assert_eq!(team.id, "alpha");
    assert!(team.agents.is_empty());
}
