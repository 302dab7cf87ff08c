// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback HTTP surface.
//!
//! A fixed verb/path vocabulary maps 1:1 onto store operations. Every
//! `/v1` route requires the bearer credential; `/healthz` does not.
//! Error bodies are `{"error":{"code","message"}}` per the wire table.

mod inbox;
mod tasks;
mod threads;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use teamd_core::{ErrorCode, TeamId};
use teamd_storage::{Store, StoreError};

/// Shared handler context.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    token: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<Store>, token: &str) -> Self {
        Self {
            store,
            token: Arc::from(token),
        }
    }
}

/// Build the daemon router.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/teams", get(tasks::list_teams).post(tasks::create_team))
        .route("/teams/{id}", get(tasks::get_team))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}/claim", post(tasks::claim_task))
        .route("/tasks/{id}/renew", post(tasks::renew_task))
        .route("/tasks/{id}/complete", post(tasks::complete_task))
        .route("/tasks/{id}/fail", post(tasks::fail_task))
        .route("/threads", post(threads::start_thread))
        .route("/threads/search", get(threads::search_threads))
        .route("/threads/{id}/messages", post(threads::post_message))
        .route("/threads/{id}/tail", get(threads::read_tail))
        .route("/threads/{id}/link", post(threads::link_thread))
        .route("/inbox", get(inbox::fetch_inbox))
        .route("/can-write", get(inbox::can_write))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", v1)
        .fallback(unknown_route)
        .with_state(state)
}

/// Error carried to the wire as `{"error":{"code","message"}}`.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": { "code": self.code.as_str(), "message": self.message }
        });
        (status, Json(body)).into_response()
    }
}

/// Bearer-token check on every `/v1` route.
async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(&*state.token) {
        return ApiError::new(
            ErrorCode::Unauthorized,
            "missing or invalid bearer credential",
        )
        .into_response();
    }
    next.run(req).await
}

/// Unauthenticated liveness probe.
async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn unknown_route() -> ApiError {
    ApiError::new(ErrorCode::NotFound, "unknown route")
}

/// Validate an optional `teamId` query parameter against the served team.
fn check_team(state: &AppState, team_id: &Option<TeamId>) -> Result<(), ApiError> {
    if let Some(id) = team_id {
        state.store.ensure_team(id)?;
    }
    Ok(())
}

/// Map a JSON body rejection onto the wire table.
fn bad_json(rejection: axum::extract::rejection::JsonRejection) -> ApiError {
    ApiError::new(ErrorCode::InvalidJson, rejection.body_text())
}

#[cfg(test)]
#[path = "../server_tests.rs"]
mod tests;
