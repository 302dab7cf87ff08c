// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent notification cache with a monotonic cursor.
//!
//! Inboxes are rebuildable from the audit log; they are caches, not
//! authority. Cursors are strictly increasing per agent and never reused.

use crate::id::{AgentId, TaskId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag on an inbox event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxEventKind {
    TaskClaimed,
    TaskCompleted,
    TaskFailed,
    ThreadMessage,
}

impl fmt::Display for InboxEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboxEventKind::TaskClaimed => write!(f, "task_claimed"),
            InboxEventKind::TaskCompleted => write!(f, "task_completed"),
            InboxEventKind::TaskFailed => write!(f, "task_failed"),
            InboxEventKind::ThreadMessage => write!(f, "thread_message"),
        }
    }
}

/// One notification delivered to an agent's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEvent {
    pub cursor: u64,
    #[serde(rename = "type")]
    pub kind: InboxEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub actor: AgentId,
    /// Short human-readable line; never multi-line.
    pub summary: String,
    /// Full body where relevant (thread messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ts: DateTime<Utc>,
}

/// An agent's inbox file: next cursor to assign plus the ordered events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbox {
    pub schema_version: u32,
    pub next_cursor: u64,
    #[serde(default)]
    pub events: Vec<InboxEvent>,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION,
            next_cursor: 1,
            events: Vec::new(),
        }
    }

    /// Append an event, assigning it the next cursor.
    pub fn push(&mut self, mut event: InboxEvent) -> u64 {
        let cursor = self.next_cursor;
        event.cursor = cursor;
        self.next_cursor += 1;
        self.events.push(event);
        cursor
    }

    /// Events strictly after the given cursor, in order.
    pub fn events_after(&self, since: u64) -> impl Iterator<Item = &InboxEvent> {
        self.events.iter().filter(move |e| e.cursor > since)
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
