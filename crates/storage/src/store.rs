// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative store over the workspace directory.
//!
//! Every mutating operation is serialized through one write gate, so the
//! on-disk model observes a total order of writes. Reads are served from
//! an in-memory mirror behind an `RwLock` and never wait on file I/O.
//! Within a mutation the ordering is: validate, append audit, persist
//! records, then install the new state in the mirror (the commit point).
//! A failure before the commit point leaves the observable model
//! unchanged.

use crate::fsio::{self, FsError};
use crate::layout::{LayoutError, TeamLayout};
use crate::paths::{normalize_resource, resource_covers, safe_join, PathError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use teamd_core::{
    AgentId, AuditEvent, AuditKind, ErrorCode, Inbox, InboxEvent, InboxEventKind, Lease, Task,
    TaskId, TaskStatus, Team, TeamId, ThreadId, ThreadMessage, ThreadRecord, SCHEMA_VERSION,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Lease duration applied when a claim or renew omits `ttlMs`.
pub const DEFAULT_TTL_MS: u64 = 60_000;

/// Default number of messages returned by a thread tail read.
const DEFAULT_TAIL_LIMIT: usize = 50;

/// Inbox summaries keep at most this many bytes of a message body.
const SUMMARY_MAX_BYTES: usize = 120;

/// Errors from store operations, mapped onto the wire table by
/// [`StoreError::code`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid team id: {0}")]
    InvalidTeamId(String),
    #[error("Invalid agent id: {0}")]
    InvalidAgentId(String),
    #[error("Invalid task: {0}")]
    InvalidTask(String),
    #[error("Invalid thread message: {0}")]
    InvalidThreadMessage(String),
    #[error("Team not found: {0}")]
    TeamNotFound(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
    #[error("Task {id} is not claimable (status {status})")]
    TaskNotClaimable { id: TaskId, status: TaskStatus },
    #[error("Task {0} is not in progress")]
    TaskNotInProgress(TaskId),
    #[error("Epoch mismatch on {id}: lease epoch is {current}, caller sent {sent}")]
    EpochMismatch { id: TaskId, current: u64, sent: u64 },
    #[error("Lease on {0} has expired")]
    LeaseExpired(TaskId),
    #[error("Lease on {id} is held by {holder}, not {caller}")]
    LeaseHolderMismatch {
        id: TaskId,
        holder: AgentId,
        caller: AgentId,
    },
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// The wire code this error surfaces as.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::InvalidTeamId(_) => ErrorCode::InvalidTeamId,
            StoreError::InvalidAgentId(_) => ErrorCode::InvalidAgentId,
            StoreError::InvalidTask(_) => ErrorCode::InvalidTask,
            StoreError::InvalidThreadMessage(_) => ErrorCode::InvalidThreadMessage,
            StoreError::TeamNotFound(_) => ErrorCode::TeamNotFound,
            StoreError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            StoreError::ThreadNotFound(_) => ErrorCode::ThreadNotFound,
            StoreError::TaskNotClaimable { .. } => ErrorCode::TaskNotClaimable,
            StoreError::TaskNotInProgress(_) => ErrorCode::TaskNotInProgress,
            StoreError::EpochMismatch { .. } => ErrorCode::EpochMismatch,
            StoreError::LeaseExpired(_) => ErrorCode::LeaseExpired,
            StoreError::LeaseHolderMismatch { .. } => ErrorCode::LeaseHolderMismatch,
            StoreError::Fs(FsError::InvalidLine { .. }) => ErrorCode::InvalidLine,
            StoreError::Fs(_) | StoreError::Io(_) => ErrorCode::InternalError,
            StoreError::Path(PathError::Traversal(_)) => ErrorCode::PathTraversal,
            StoreError::Path(PathError::SymlinkEscape(_)) => ErrorCode::SymlinkEscape,
            StoreError::Path(PathError::Io { .. }) => ErrorCode::InternalError,
            StoreError::Layout(LayoutError::InvalidTeamId(_)) => ErrorCode::InvalidTeamId,
            StoreError::Layout(_) => ErrorCode::InternalError,
        }
    }
}

/// Inputs to task creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deps: Vec<TaskId>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Result of task creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task: Task,
    pub created: bool,
}

/// Inputs to thread creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartThread {
    pub title: String,
    #[serde(default)]
    pub participants: Vec<AgentId>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub originator: AgentId,
}

/// Terminal outcome of a finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
}

/// A thread plus the tail of its message log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadTail {
    pub thread: ThreadRecord,
    pub messages: Vec<ThreadMessage>,
}

/// A page of inbox events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxPage {
    pub events: Vec<InboxEvent>,
    pub next_since: u64,
}

/// Outcome of a write-permission check. Never an error: every failure
/// mode collapses to a structured deny.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteDecision {
    pub allow: bool,
    pub reason: String,
}

impl WriteDecision {
    fn allow() -> Self {
        Self {
            allow: true,
            reason: "lease_active_for_resource".to_string(),
        }
    }

    fn deny(reason: &str) -> Self {
        Self {
            allow: false,
            reason: reason.to_string(),
        }
    }
}

/// Idempotency map entry: key to the task it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyRecord {
    pub task_id: TaskId,
    pub created_at: DateTime<Utc>,
}

/// In-memory mirror of the on-disk model.
#[derive(Debug, Clone)]
struct TeamState {
    team: Team,
    team_file_exists: bool,
    tasks: BTreeMap<TaskId, Task>,
    threads: BTreeMap<ThreadId, ThreadRecord>,
    inboxes: BTreeMap<AgentId, Inbox>,
    idempotency: BTreeMap<String, IdempotencyRecord>,
}

/// The authoritative model. One instance per daemon, one daemon per team
/// workspace directory.
#[derive(Debug)]
pub struct Store {
    layout: TeamLayout,
    state: RwLock<TeamState>,
    /// Serial mutation queue: holding this across validate, persist, and
    /// commit totally orders all writers.
    write_gate: Mutex<()>,
}

impl Store {
    /// Load the store from disk. Missing files read as empty; the team
    /// record defaults to an empty team until an explicit create call.
    pub fn open(layout: TeamLayout) -> Result<Self, StoreError> {
        let team_file = fsio::read_json_opt::<Team>(&layout.team_file())?;
        let team_file_exists = team_file.is_some();
        let team = team_file.unwrap_or_else(|| Team::empty(layout.team_id().clone()));

        let mut tasks = BTreeMap::new();
        let tasks_dir = layout.tasks_dir();
        if tasks_dir.is_dir() {
            for entry in fs::read_dir(&tasks_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(task) = fsio::read_json_opt::<Task>(&path)? {
                    tasks.insert(task.id.clone(), task);
                }
            }
        }

        let threads: Vec<ThreadRecord> =
            fsio::read_json_opt(&layout.threads_index())?.unwrap_or_default();
        let threads: BTreeMap<ThreadId, ThreadRecord> =
            threads.into_iter().map(|t| (t.id.clone(), t)).collect();

        let mut inboxes = BTreeMap::new();
        let inboxes_dir = layout.inboxes_dir();
        if inboxes_dir.is_dir() {
            for entry in fs::read_dir(&inboxes_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if let Some(inbox) = fsio::read_json_opt::<Inbox>(&path)? {
                    inboxes.insert(AgentId::new(stem), inbox);
                }
            }
        }

        let idempotency: BTreeMap<String, IdempotencyRecord> =
            fsio::read_json_opt(&layout.idempotency_file())?.unwrap_or_default();

        info!(
            team = %layout.team_id(),
            tasks = tasks.len(),
            threads = threads.len(),
            inboxes = inboxes.len(),
            "store opened"
        );

        Ok(Self {
            layout,
            state: RwLock::new(TeamState {
                team,
                team_file_exists,
                tasks,
                threads,
                inboxes,
                idempotency,
            }),
            write_gate: Mutex::new(()),
        })
    }

    pub fn layout(&self) -> &TeamLayout {
        &self.layout
    }

    // ----- teams -----

    /// The team this store serves (default empty until explicitly created).
    pub fn team(&self) -> Team {
        self.state.read().team.clone()
    }

    /// Validate a caller-supplied team id against the one we serve.
    pub fn ensure_team(&self, id: &TeamId) -> Result<(), StoreError> {
        if id != self.layout.team_id() {
            return Err(StoreError::TeamNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Store the team record. A second create is a no-op returning the
    /// stored record; the team is never destroyed.
    pub async fn create_team(&self, team: Team) -> Result<(Team, bool), StoreError> {
        let _gate = self.write_gate.lock().await;

        if !team.id.is_valid() {
            return Err(StoreError::InvalidTeamId(team.id.to_string()));
        }
        if team.id != *self.layout.team_id() {
            return Err(StoreError::InvalidTeamId(format!(
                "{} (this daemon serves {})",
                team.id,
                self.layout.team_id()
            )));
        }
        for agent in &team.agents {
            if !agent.id.is_valid() {
                return Err(StoreError::InvalidAgentId(agent.id.to_string()));
            }
        }

        if self.state.read().team_file_exists {
            return Ok((self.state.read().team.clone(), false));
        }

        let mut team = team;
        team.schema_version = SCHEMA_VERSION;
        self.append_audit(
            &AuditEvent::new(AgentId::new("daemon"), AuditKind::TeamCreated)
                .data(json!({ "teamId": team.id })),
        )?;
        fsio::write_json_atomic(&self.layout.team_file(), &team)?;

        let mut state = self.state.write();
        state.team = team.clone();
        state.team_file_exists = true;
        info!(team = %team.id, agents = team.agents.len(), "team created");
        Ok((team, true))
    }

    // ----- tasks -----

    pub fn list_tasks(&self) -> Vec<Task> {
        self.state.read().tasks.values().cloned().collect()
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.state
            .read()
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
    }

    /// Create a task, minting `task-NNNN`. With an idempotency key, a
    /// repeat returns the originally minted task with `created = false`
    /// even if the payload differs (first payload wins).
    pub async fn create_task(&self, req: CreateTask) -> Result<CreatedTask, StoreError> {
        let _gate = self.write_gate.lock().await;

        if req.title.trim().is_empty() {
            return Err(StoreError::InvalidTask("title must not be empty".into()));
        }
        for dep in &req.deps {
            if !dep.is_valid() {
                return Err(StoreError::InvalidTask(format!("invalid dependency id: {dep}")));
            }
        }
        let mut resources = Vec::with_capacity(req.resources.len());
        for raw in &req.resources {
            let normalized = normalize_resource(raw)
                .ok_or_else(|| StoreError::InvalidTask(format!("invalid resource path: {raw}")))?;
            if !resources.contains(&normalized) {
                resources.push(normalized);
            }
        }

        if let Some(key) = &req.idempotency_key {
            let state = self.state.read();
            if let Some(record) = state.idempotency.get(key) {
                if let Some(task) = state.tasks.get(&record.task_id) {
                    return Ok(CreatedTask {
                        task: task.clone(),
                        created: false,
                    });
                }
            }
        }

        let now = Utc::now();
        let (id, status) = {
            let state = self.state.read();
            let id = TaskId::new(teamd_core::mint_numeric_id(
                "task",
                state.tasks.keys().map(|k| k.as_str()),
            ));
            let deps_satisfied = req.deps.iter().all(|dep| {
                state
                    .tasks
                    .get(dep)
                    .is_some_and(|t| t.status == TaskStatus::Completed)
            });
            let status = if deps_satisfied {
                TaskStatus::Pending
            } else {
                TaskStatus::Blocked
            };
            (id, status)
        };

        let task = Task {
            schema_version: SCHEMA_VERSION,
            id: id.clone(),
            title: req.title,
            description: req.description,
            status,
            owner: None,
            deps: req.deps,
            resources,
            lease: None,
            epoch: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            failed_at: None,
        };

        self.append_audit(
            &AuditEvent::new(AgentId::new("daemon"), AuditKind::TaskCreated)
                .task(&id)
                .data(json!({ "title": task.title, "status": task.status })),
        )?;
        self.persist_task(&task)?;

        let idempotency_update = if let Some(key) = &req.idempotency_key {
            let mut map = self.state.read().idempotency.clone();
            map.insert(
                key.clone(),
                IdempotencyRecord {
                    task_id: id.clone(),
                    created_at: now,
                },
            );
            fsio::write_json_atomic(&self.layout.idempotency_file(), &map)?;
            Some(map)
        } else {
            None
        };

        let mut state = self.state.write();
        state.tasks.insert(id.clone(), task.clone());
        if let Some(map) = idempotency_update {
            state.idempotency = map;
        }
        info!(task_id = %id, status = %task.status, "task created");
        Ok(CreatedTask {
            task,
            created: true,
        })
    }

    /// Claim a pending task: increments the epoch and installs the lease.
    ///
    /// A task left `in_progress` by an expired lease is silently reset to
    /// `pending` before the claim proceeds, inside the same serialized
    /// mutation.
    pub async fn claim_task(
        &self,
        id: &TaskId,
        agent: &AgentId,
        ttl_ms: Option<u64>,
    ) -> Result<Task, StoreError> {
        let _gate = self.write_gate.lock().await;

        if !agent.is_valid() {
            return Err(StoreError::InvalidAgentId(agent.to_string()));
        }
        let now = Utc::now();
        let mut task = self.get_task(id)?;

        if task.status == TaskStatus::InProgress
            && task.lease.as_ref().is_some_and(|l| l.is_expired_at(now))
        {
            warn!(task_id = %id, "resetting expired lease before claim");
            task.status = TaskStatus::Pending;
            task.lease = None;
        }
        if task.status != TaskStatus::Pending {
            return Err(StoreError::TaskNotClaimable {
                id: id.clone(),
                status: task.status,
            });
        }

        let ttl = ttl_ms.unwrap_or(DEFAULT_TTL_MS);
        task.epoch += 1;
        let lease = Lease {
            holder: agent.clone(),
            epoch: task.epoch,
            expires_at: now + Duration::milliseconds(ttl as i64),
        };
        task.lease = Some(lease.clone());
        task.owner = Some(agent.clone());
        task.status = TaskStatus::InProgress;
        if task.started_at.is_none() {
            task.started_at = Some(now);
        }

        self.append_audit(
            &AuditEvent::new(agent.clone(), AuditKind::TaskClaimed)
                .task(id)
                .data(json!({ "epoch": task.epoch, "expiresAt": lease.expires_at })),
        )?;
        self.persist_task(&task)?;
        let inboxes = self.fan_out_task(
            InboxEventKind::TaskClaimed,
            id,
            agent,
            format!("Task {id} claimed by {agent}"),
        )?;

        let mut state = self.state.write();
        state.tasks.insert(id.clone(), task.clone());
        state.inboxes.extend(inboxes);
        info!(task_id = %id, agent = %agent, epoch = task.epoch, "task claimed");
        Ok(task)
    }

    /// Extend a live lease. Requires the exact fencing token.
    pub async fn renew_task(
        &self,
        id: &TaskId,
        agent: &AgentId,
        epoch: u64,
        ttl_ms: Option<u64>,
    ) -> Result<Task, StoreError> {
        let _gate = self.write_gate.lock().await;

        let now = Utc::now();
        let mut task = self.get_task(id)?;
        check_fencing(&task, agent, epoch, now)?;

        let ttl = ttl_ms.unwrap_or(DEFAULT_TTL_MS);
        let expires_at = now + Duration::milliseconds(ttl as i64);
        if let Some(lease) = task.lease.as_mut() {
            lease.expires_at = expires_at;
        }

        self.append_audit(
            &AuditEvent::new(agent.clone(), AuditKind::TaskRenewed)
                .task(id)
                .data(json!({ "epoch": epoch, "expiresAt": expires_at })),
        )?;
        self.persist_task(&task)?;

        let mut state = self.state.write();
        state.tasks.insert(id.clone(), task.clone());
        Ok(task)
    }

    /// Finalize a task to `completed` or `failed`. Requires the exact
    /// fencing token; completion unblocks dependents whose last
    /// outstanding dependency this was.
    pub async fn finalize_task(
        &self,
        id: &TaskId,
        agent: &AgentId,
        epoch: u64,
        outcome: TaskOutcome,
    ) -> Result<Task, StoreError> {
        let _gate = self.write_gate.lock().await;

        let now = Utc::now();
        let mut task = self.get_task(id)?;
        check_fencing(&task, agent, epoch, now)?;

        task.lease = None;
        let (kind, inbox_kind) = match outcome {
            TaskOutcome::Completed => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(now);
                (AuditKind::TaskCompleted, InboxEventKind::TaskCompleted)
            }
            TaskOutcome::Failed => {
                task.status = TaskStatus::Failed;
                task.failed_at = Some(now);
                (AuditKind::TaskFailed, InboxEventKind::TaskFailed)
            }
        };

        // Completion may satisfy the last outstanding dependency of
        // blocked tasks; scan and unblock them in the same mutation.
        let unblocked: Vec<Task> = if outcome == TaskOutcome::Completed {
            let state = self.state.read();
            state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Blocked && t.deps.iter().any(|d| d == id))
                .filter(|t| {
                    t.deps.iter().all(|dep| {
                        dep == id
                            || state
                                .tasks
                                .get(dep)
                                .is_some_and(|d| d.status == TaskStatus::Completed)
                    })
                })
                .map(|t| {
                    let mut t = t.clone();
                    t.status = TaskStatus::Pending;
                    t
                })
                .collect()
        } else {
            Vec::new()
        };

        self.append_audit(
            &AuditEvent::new(agent.clone(), kind)
                .task(id)
                .data(json!({ "epoch": epoch })),
        )?;
        for dependent in &unblocked {
            self.append_audit(
                &AuditEvent::new(agent.clone(), AuditKind::TaskUnblocked)
                    .task(&dependent.id)
                    .data(json!({ "completedDependency": id })),
            )?;
        }

        self.persist_task(&task)?;
        for dependent in &unblocked {
            self.persist_task(dependent)?;
        }

        let verb = match outcome {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed => "failed",
        };
        let inboxes =
            self.fan_out_task(inbox_kind, id, agent, format!("Task {id} {verb} by {agent}"))?;

        let mut state = self.state.write();
        state.tasks.insert(id.clone(), task.clone());
        for dependent in unblocked {
            info!(task_id = %dependent.id, "task unblocked");
            state.tasks.insert(dependent.id.clone(), dependent);
        }
        state.inboxes.extend(inboxes);
        info!(task_id = %id, agent = %agent, outcome = verb, "task finalized");
        Ok(task)
    }

    // ----- threads -----

    /// Start a discussion thread. The originator is folded into the
    /// participant set if absent.
    pub async fn start_thread(&self, req: StartThread) -> Result<ThreadRecord, StoreError> {
        let _gate = self.write_gate.lock().await;

        if !req.originator.is_valid() {
            return Err(StoreError::InvalidAgentId(req.originator.to_string()));
        }
        for participant in &req.participants {
            if !participant.is_valid() {
                return Err(StoreError::InvalidAgentId(participant.to_string()));
            }
        }
        if let Some(task_id) = &req.task_id {
            if !self.state.read().tasks.contains_key(task_id) {
                return Err(StoreError::TaskNotFound(task_id.to_string()));
            }
        }

        let now = Utc::now();
        let id = {
            let state = self.state.read();
            ThreadId::new(teamd_core::mint_numeric_id(
                "thread",
                state.threads.keys().map(|k| k.as_str()),
            ))
        };

        let mut participants: Vec<AgentId> = Vec::new();
        for p in &req.participants {
            if !participants.contains(p) {
                participants.push(p.clone());
            }
        }
        if !participants.contains(&req.originator) {
            participants.insert(0, req.originator.clone());
        }

        let thread = ThreadRecord {
            schema_version: SCHEMA_VERSION,
            id: id.clone(),
            title: req.title,
            participants,
            task_id: req.task_id,
            created_at: now,
            updated_at: now,
        };

        self.append_audit(
            &AuditEvent::new(req.originator.clone(), AuditKind::ThreadStarted)
                .thread(&id)
                .data(json!({ "title": thread.title })),
        )?;

        let mut threads = self.state.read().threads.clone();
        threads.insert(id.clone(), thread.clone());
        self.persist_threads_index(&threads)?;

        self.state.write().threads = threads;
        info!(thread_id = %id, "thread started");
        Ok(thread)
    }

    /// Append a message. The author is folded into the participant set;
    /// all other participants receive an inbox event.
    pub async fn post_message(
        &self,
        thread_id: &ThreadId,
        author: &AgentId,
        body: &str,
    ) -> Result<ThreadMessage, StoreError> {
        let _gate = self.write_gate.lock().await;

        if !author.is_valid() {
            return Err(StoreError::InvalidAgentId(author.to_string()));
        }
        if body.trim().is_empty() {
            return Err(StoreError::InvalidThreadMessage(
                "body must not be empty".into(),
            ));
        }
        let mut thread = self
            .state
            .read()
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        let now = Utc::now();
        let message = ThreadMessage {
            schema_version: SCHEMA_VERSION,
            id: teamd_core::mint_message_id(),
            thread_id: thread_id.clone(),
            author: author.clone(),
            body: body.to_string(),
            ts: now,
        };

        thread.add_participant(author);
        thread.updated_at = now;

        self.append_audit(
            &AuditEvent::new(author.clone(), AuditKind::ThreadMessagePosted)
                .thread(thread_id)
                .data(json!({ "messageId": message.id })),
        )?;
        fsio::append_jsonl(&self.layout.thread_log(thread_id), &message)?;

        let mut threads = self.state.read().threads.clone();
        threads.insert(thread_id.clone(), thread.clone());
        self.persist_threads_index(&threads)?;

        let recipients: Vec<AgentId> = thread
            .participants
            .iter()
            .filter(|p| *p != author)
            .cloned()
            .collect();
        let inboxes = self.fan_out(
            recipients,
            InboxEvent {
                cursor: 0,
                kind: InboxEventKind::ThreadMessage,
                task_id: None,
                thread_id: Some(thread_id.clone()),
                actor: author.clone(),
                summary: summarize_body(body),
                content: Some(body.to_string()),
                ts: now,
            },
        )?;

        let mut state = self.state.write();
        state.threads = threads;
        state.inboxes.extend(inboxes);
        info!(thread_id = %thread_id, author = %author, "message posted");
        Ok(message)
    }

    /// The last `limit` messages of a thread, tolerating a
    /// crash-interrupted trailing append.
    pub fn read_thread_tail(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> Result<ThreadTail, StoreError> {
        let thread = self
            .state
            .read()
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        let mut messages: Vec<ThreadMessage> =
            fsio::read_jsonl(&self.layout.thread_log(thread_id))?;
        let limit = limit.unwrap_or(DEFAULT_TAIL_LIMIT);
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(ThreadTail { thread, messages })
    }

    /// Case-insensitive substring match over thread titles.
    pub fn search_threads(&self, query: &str) -> Vec<ThreadRecord> {
        let needle = query.to_lowercase();
        self.state
            .read()
            .threads
            .values()
            .filter(|t| needle.is_empty() || t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Link a thread to a task.
    pub async fn link_thread(
        &self,
        thread_id: &ThreadId,
        task_id: &TaskId,
    ) -> Result<ThreadRecord, StoreError> {
        let _gate = self.write_gate.lock().await;

        let mut thread = self
            .state
            .read()
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;
        if !self.state.read().tasks.contains_key(task_id) {
            return Err(StoreError::TaskNotFound(task_id.to_string()));
        }

        thread.task_id = Some(task_id.clone());
        thread.updated_at = Utc::now();

        self.append_audit(
            &AuditEvent::new(AgentId::new("daemon"), AuditKind::ThreadLinked)
                .thread(thread_id)
                .task(task_id),
        )?;

        let mut threads = self.state.read().threads.clone();
        threads.insert(thread_id.clone(), thread.clone());
        self.persist_threads_index(&threads)?;

        self.state.write().threads = threads;
        Ok(thread)
    }

    // ----- inboxes -----

    /// Events for an agent strictly after `since`, plus the cursor to
    /// resume from.
    pub fn fetch_inbox(
        &self,
        agent: &AgentId,
        since: Option<u64>,
    ) -> Result<InboxPage, StoreError> {
        if !agent.is_valid() {
            return Err(StoreError::InvalidAgentId(agent.to_string()));
        }
        let since = since.unwrap_or(0);
        let state = self.state.read();
        let events: Vec<InboxEvent> = state
            .inboxes
            .get(agent)
            .map(|inbox| inbox.events_after(since).cloned().collect())
            .unwrap_or_default();
        let next_since = events.last().map(|e| e.cursor).unwrap_or(since);
        Ok(InboxPage { events, next_since })
    }

    // ----- can-write -----

    /// Whether `agent` currently holds a live lease whose resources cover
    /// `path`. Always structured; never an error. The path is interpreted
    /// relative to the workspace root.
    pub fn can_write(&self, agent: &AgentId, path: &str) -> WriteDecision {
        let slashed = path.replace('\\', "/");
        if slashed.split('/').any(|part| part == "..") {
            return WriteDecision::deny("path_traversal_denied");
        }
        let Some(normalized) = normalize_resource(&slashed) else {
            return WriteDecision::deny("invalid_path");
        };
        match safe_join(self.layout.root(), &normalized) {
            Ok(_) => {}
            Err(PathError::Traversal(_)) | Err(PathError::SymlinkEscape(_)) => {
                return WriteDecision::deny("path_traversal_denied");
            }
            Err(PathError::Io { .. }) => return WriteDecision::deny("invalid_path"),
        }

        let now = Utc::now();
        let state = self.state.read();
        let covered = state.tasks.values().any(|task| {
            task.lease_is_active(now)
                && task.lease.as_ref().is_some_and(|l| &l.holder == agent)
                && task
                    .resources
                    .iter()
                    .any(|resource| resource_covers(resource, &normalized))
        });
        if covered {
            WriteDecision::allow()
        } else {
            WriteDecision::deny("no_active_lease_for_path")
        }
    }

    // ----- persistence helpers -----

    fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        fsio::append_jsonl(&self.layout.audit_log(), event)?;
        Ok(())
    }

    fn persist_task(&self, task: &Task) -> Result<(), StoreError> {
        fsio::write_json_atomic(&self.layout.task_file(&task.id), task)?;
        Ok(())
    }

    fn persist_threads_index(
        &self,
        threads: &BTreeMap<ThreadId, ThreadRecord>,
    ) -> Result<(), StoreError> {
        let records: Vec<&ThreadRecord> = threads.values().collect();
        fsio::write_json_atomic(&self.layout.threads_index(), &records)?;
        Ok(())
    }

    /// Broadcast a task event to every known team agent plus everyone who
    /// already has an inbox, excluding nobody.
    fn fan_out_task(
        &self,
        kind: InboxEventKind,
        task_id: &TaskId,
        actor: &AgentId,
        summary: String,
    ) -> Result<Vec<(AgentId, Inbox)>, StoreError> {
        let recipients: Vec<AgentId> = {
            let state = self.state.read();
            let mut set: BTreeSet<AgentId> = state.team.agent_ids().cloned().collect();
            set.extend(state.inboxes.keys().cloned());
            set.into_iter().collect()
        };
        self.fan_out(
            recipients,
            InboxEvent {
                cursor: 0,
                kind,
                task_id: Some(task_id.clone()),
                thread_id: None,
                actor: actor.clone(),
                summary,
                content: None,
                ts: Utc::now(),
            },
        )
    }

    /// Append an event to each recipient's inbox and persist it. Returns
    /// the updated inboxes for the commit step.
    fn fan_out(
        &self,
        recipients: Vec<AgentId>,
        event: InboxEvent,
    ) -> Result<Vec<(AgentId, Inbox)>, StoreError> {
        let mut updated = Vec::with_capacity(recipients.len());
        for agent in recipients {
            let mut inbox = {
                let state = self.state.read();
                state.inboxes.get(&agent).cloned().unwrap_or_default()
            };
            inbox.push(event.clone());
            fsio::write_json_atomic(&self.layout.inbox_file(&agent), &inbox)?;
            updated.push((agent, inbox));
        }
        Ok(updated)
    }
}

/// Fencing-token check for renew and finalize: the task must be in
/// progress, the holder and epoch must match, and the lease must not
/// have expired. Expiry is evaluated at decision time.
fn check_fencing(
    task: &Task,
    agent: &AgentId,
    epoch: u64,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if task.status != TaskStatus::InProgress {
        return Err(StoreError::TaskNotInProgress(task.id.clone()));
    }
    let Some(lease) = &task.lease else {
        return Err(StoreError::TaskNotInProgress(task.id.clone()));
    };
    if lease.holder != *agent {
        return Err(StoreError::LeaseHolderMismatch {
            id: task.id.clone(),
            holder: lease.holder.clone(),
            caller: agent.clone(),
        });
    }
    if lease.epoch != epoch {
        return Err(StoreError::EpochMismatch {
            id: task.id.clone(),
            current: lease.epoch,
            sent: epoch,
        });
    }
    if lease.is_expired_at(now) {
        return Err(StoreError::LeaseExpired(task.id.clone()));
    }
    Ok(())
}

/// Collapse a message body to a single line of at most
/// [`SUMMARY_MAX_BYTES`] bytes, cut on a character boundary.
fn summarize_body(body: &str) -> String {
    let one_line = body.replace(['\n', '\r'], " ");
    if one_line.len() <= SUMMARY_MAX_BYTES {
        return one_line;
    }
    let mut end = SUMMARY_MAX_BYTES;
    while !one_line.is_char_boundary(end) {
        end -= 1;
    }
    one_line[..end].to_string()
}

#[cfg(test)]
#[path = "store_tests/mod.rs"]
mod tests;
