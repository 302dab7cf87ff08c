// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and its lifecycle state machine.
//!
//! Invariants held by every persisted task:
//! - `lease` is non-null iff `status == InProgress`
//! - when `lease` is non-null, `owner == lease.holder` and `epoch == lease.epoch`
//! - `epoch` is strictly increasing across successful claims
//! - `status == Blocked` iff at least one dependency is not completed

use crate::id::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Blocked,
    InProgress,
    Completed,
    Failed,
    /// Defined but unreachable through the current API; reserved for an
    /// explicit cancellation endpoint.
    Canceled,
}

impl TaskStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Blocked => write!(f, "blocked"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Time-bounded exclusive right to mutate a task and its resources.
///
/// The triple `(holder, epoch, expires_at)` is the fencing token: a
/// finalize carrying a stale epoch is a stale token and must be rejected
/// regardless of the holder id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub holder: AgentId,
    pub epoch: u64,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Unit of work owned by the coordination daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub schema_version: u32,
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<AgentId>,
    #[serde(default)]
    pub deps: Vec<TaskId>,
    /// Normalized path prefixes this task's lease authorizes writes under.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
    #[serde(default)]
    pub epoch: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the task currently holds a live (unexpired) lease.
    pub fn lease_is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::InProgress
            && self
                .lease
                .as_ref()
                .is_some_and(|lease| !lease.is_expired_at(now))
    }

    /// Whether the lease structure is internally consistent.
    pub fn holds_lease_invariants(&self) -> bool {
        match &self.lease {
            Some(lease) => {
                self.status == TaskStatus::InProgress
                    && self.owner.as_ref() == Some(&lease.holder)
                    && self.epoch == lease.epoch
            }
            None => self.status != TaskStatus::InProgress,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
