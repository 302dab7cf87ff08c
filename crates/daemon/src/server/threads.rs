// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use teamd_core::{AgentId, TaskId, TeamId, ThreadId};
use teamd_storage::StartThread;

use super::{bad_json, check_team, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartThreadBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    #[serde(flatten)]
    thread: StartThread,
}

pub(super) async fn start_thread(
    State(state): State<AppState>,
    body: Result<Json<StartThreadBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let thread = state.store.start_thread(body.thread).await?;
    Ok((StatusCode::CREATED, Json(json!({ "thread": thread }))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchQuery {
    team_id: Option<TeamId>,
    #[serde(default)]
    q: String,
}

pub(super) async fn search_threads(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &query.team_id)?;
    Ok(Json(json!({ "threads": state.store.search_threads(&query.q) })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostMessageBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    agent_id: AgentId,
    body: String,
}

pub(super) async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<ThreadId>,
    body: Result<Json<PostMessageBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let message = state
        .store
        .post_message(&id, &body.agent_id, &body.body)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TailQuery {
    team_id: Option<TeamId>,
    limit: Option<usize>,
}

pub(super) async fn read_tail(
    State(state): State<AppState>,
    Path(id): Path<ThreadId>,
    Query(query): Query<TailQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_team(&state, &query.team_id)?;
    let tail = state.store.read_thread_tail(&id, query.limit)?;
    Ok(Json(json!(tail)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LinkBody {
    #[serde(default)]
    team_id: Option<TeamId>,
    task_id: TaskId,
}

pub(super) async fn link_thread(
    State(state): State<AppState>,
    Path(id): Path<ThreadId>,
    body: Result<Json<LinkBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    check_team(&state, &body.team_id)?;
    let thread = state.store.link_thread(&id, &body.task_id).await?;
    Ok(Json(json!({ "thread": thread })))
}
