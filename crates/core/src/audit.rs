// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit record of every state transition.
//!
//! Audit is authority for observability only; recovery never replays it.

use crate::id::{AgentId, TaskId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag on an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    TeamCreated,
    TaskCreated,
    TaskClaimed,
    TaskRenewed,
    TaskCompleted,
    TaskFailed,
    TaskUnblocked,
    ThreadStarted,
    ThreadMessagePosted,
    ThreadLinked,
}

/// One audit log line, written before the mutation becomes observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub schema_version: u32,
    pub ts: DateTime<Utc>,
    pub actor: AgentId,
    #[serde(rename = "type")]
    pub kind: AuditKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl AuditEvent {
    pub fn new(actor: AgentId, kind: AuditKind) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION,
            ts: Utc::now(),
            actor,
            kind,
            task_id: None,
            thread_id: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn task(mut self, id: &TaskId) -> Self {
        self.task_id = Some(id.clone());
        self
    }

    pub fn thread(mut self, id: &ThreadId) -> Self {
        self.thread_id = Some(id.clone());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}
