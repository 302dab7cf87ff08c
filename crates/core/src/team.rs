// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team record: the named scope that owns a workspace directory.

use crate::id::{AgentId, TeamId};
use serde::{Deserialize, Serialize};

/// One configured agent within a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub id: AgentId,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Team record. One per workspace; created on first initialization and
/// never destroyed by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub schema_version: u32,
    pub id: TeamId,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    /// Opaque budget hints; the daemon stores and serves them untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<serde_json::Value>,
}

impl Team {
    /// Default record written when a workspace is initialized without an
    /// explicit team definition.
    pub fn empty(id: TeamId) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION,
            id,
            agents: Vec::new(),
            budget: None,
        }
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.agents.iter().map(|a| &a.id)
    }
}
