// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox and write-permission handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use teamd_core::{AgentId, TeamId};

use super::{check_team, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InboxQuery {
    team_id: Option<TeamId>,
    agent_id: AgentId,
    since: Option<u64>,
}

pub(super) async fn fetch_inbox(
    State(state): State<AppState>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &query.team_id)?;
    let page = state.store.fetch_inbox(&query.agent_id, query.since)?;
    Ok(Json(json!(page)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CanWriteQuery {
    team_id: Option<TeamId>,
    agent_id: AgentId,
    path: String,
}

pub(super) async fn can_write(
    State(state): State<AppState>,
    Query(query): Query<CanWriteQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &query.team_id)?;
    let decision = state.store.can_write(&query.agent_id, &query.path);
    Ok(Json(json!(decision)))
}
