// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team and task handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use teamd_core::{AgentId, TaskId, Team, TeamId};
use teamd_storage::{CreateTask, TaskOutcome};

use super::{bad_json, check_team, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TeamScope {
    team_id: Option<TeamId>,
}

pub(super) async fn list_teams(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "teams": [state.store.team()] }))
}

pub(super) async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.ensure_team(&id)?;
    Ok(Json(json!({ "team": state.store.team() })))
}

pub(super) async fn create_team(
    State(state): State<AppState>,
    body: Result<Json<Team>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(team) = body.map_err(bad_json)?;
    let (team, created) = state.store.create_team(team).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "team": team, "created": created }))).into_response())
}

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    Query(scope): Query<TeamScope>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &scope.team_id)?;
    Ok(Json(json!({ "tasks": state.store.list_tasks() })))
}

pub(super) async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Query(scope): Query<TeamScope>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &scope.team_id)?;
    Ok(Json(json!({ "task": state.store.get_task(&id)? })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateTaskBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    #[serde(flatten)]
    task: CreateTask,
}

pub(super) async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateTaskBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;

    let mut req = body.task;
    // The Idempotency-Key header wins over any body field
    if let Some(key) = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty())
    {
        req.idempotency_key = Some(key.to_string());
    }

    let result = state.store.create_task(req).await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!(result))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ClaimBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    agent_id: AgentId,
    #[serde(default)]
    ttl_ms: Option<u64>,
}

pub(super) async fn claim_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    body: Result<Json<ClaimBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let task = state
        .store
        .claim_task(&id, &body.agent_id, body.ttl_ms)
        .await?;
    let lease = task.lease.clone();
    Ok(Json(json!({ "task": task, "lease": lease })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RenewBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    agent_id: AgentId,
    epoch: u64,
    #[serde(default)]
    ttl_ms: Option<u64>,
}

pub(super) async fn renew_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    body: Result<Json<RenewBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let task = state
        .store
        .renew_task(&id, &body.agent_id, body.epoch, body.ttl_ms)
        .await?;
    let lease = task.lease.clone();
    Ok(Json(json!({ "task": task, "lease": lease })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FinalizeBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    agent_id: AgentId,
    epoch: u64,
}

pub(super) async fn complete_task(
    state: State<AppState>,
    id: Path<TaskId>,
    body: Result<Json<FinalizeBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    finalize(state, id, body, TaskOutcome::Completed).await
}

pub(super) async fn fail_task(
    state: State<AppState>,
    id: Path<TaskId>,
    body: Result<Json<FinalizeBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    finalize(state, id, body, TaskOutcome::Failed).await
}

async fn finalize(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    body: Result<Json<FinalizeBody>, JsonRejection>,
    outcome: TaskOutcome,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let task = state
        .store
        .finalize_task(&id, &body.agent_id, body.epoch, outcome)
        .await?;
    Ok(Json(json!({ "task": task })))
}
