// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;

fn task(status: TaskStatus, lease: Option<Lease>) -> Task {
    let owner = lease.as_ref().map(|l| l.holder.clone());
    let epoch = lease.as_ref().map(|l| l.epoch).unwrap_or(0);
    Task {
        schema_version: crate::SCHEMA_VERSION,
        id: TaskId::new("task-0001"),
        title: "build".to_string(),
        description: String::new(),
        status,
        owner,
        deps: Vec::new(),
        resources: Vec::new(),
        lease,
        epoch,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        failed_at: None,
    }
}

fn lease(holder: &str, epoch: u64, expires_in_ms: i64) -> Lease {
    Lease {
        holder: AgentId::new(holder),
        epoch,
        expires_at: Utc::now() + Duration::milliseconds(expires_in_ms),
    }
}

#[test]
fn live_lease_is_active() {
    let t = task(TaskStatus::InProgress, Some(lease("worker_a", 1, 60_000)));
    assert!(t.lease_is_active(Utc::now()));
    assert!(t.holds_lease_invariants());
}

#[test]
fn expired_lease_is_not_active() {
    let t = task(TaskStatus::InProgress, Some(lease("worker_a", 1, -10)));
    assert!(!t.lease_is_active(Utc::now()));
}

#[test]
fn pending_task_has_no_active_lease() {
    let t = task(TaskStatus::Pending, None);
    assert!(!t.lease_is_active(Utc::now()));
    assert!(t.holds_lease_invariants());
}

#[test]
fn lease_without_in_progress_violates_invariants() {
    let mut t = task(TaskStatus::InProgress, Some(lease("worker_a", 2, 60_000)));
    t.status = TaskStatus::Completed;
    assert!(!t.holds_lease_invariants());
}

#[test]
fn epoch_mismatch_violates_invariants() {
    let mut t = task(TaskStatus::InProgress, Some(lease("worker_a", 2, 60_000)));
    t.epoch = 1;
    assert!(!t.holds_lease_invariants());
}

#[test]
fn terminal_states() {
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Canceled.is_terminal());
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Blocked.is_terminal());
    assert!(!TaskStatus::InProgress.is_terminal());
}

#[test]
fn status_serializes_snake_case() {
    let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
    assert_eq!(json, "\"in_progress\"");
}

#[test]
fn task_round_trips_with_camel_case_fields() {
    let t = task(TaskStatus::InProgress, Some(lease("worker_a", 3, 60_000)));
    let json = serde_json::to_value(&t).unwrap();
    assert_eq!(json["schemaVersion"], 1);
    assert_eq!(json["lease"]["expiresAt"].as_str().is_some(), true);
    let back: Task = serde_json::from_value(json).unwrap();
    assert_eq!(back.epoch, 3);
    assert_eq!(back.lease.unwrap().holder, "worker_a");
}
