// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread records: durable discussion channels with append-only messages.

use crate::id::{AgentId, TaskId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion channel. Stored in `threads/index.json`; messages live in
/// a per-thread line-delimited log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    pub schema_version: u32,
    pub id: ThreadId,
    pub title: String,
    /// Ordered, duplicate-free participant set.
    pub participants: Vec<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadRecord {
    /// Add a participant preserving order; returns true if it was absent.
    pub fn add_participant(&mut self, agent: &AgentId) -> bool {
        if self.participants.iter().any(|p| p == agent) {
            return false;
        }
        self.participants.push(agent.clone());
        true
    }
}

/// One message in a thread. Append-only: no updates, no deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub schema_version: u32,
    pub id: String,
    pub thread_id: ThreadId,
    pub author: AgentId,
    pub body: String,
    pub ts: DateTime<Utc>,
}
