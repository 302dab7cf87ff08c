// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk shape of a team workspace directory.
//!
//! ```text
//! <root>/<teamId>/
//!   team.json                      team record
//!   runtime.json                   runtime descriptor, mode 0600
//!   .teamd.lock                    single-instance lock
//!   tasks/<id>.json                one task per file
//!   threads/index.json             thread records
//!   threads/<id>.jsonl             one message per line
//!   inboxes/<agentId>.json         per-agent notification cache
//!   audit/events.jsonl             one audit event per line
//!   idempotency/create-task.json   idempotency key map
//!   artifacts/                     reserved; never written by the daemon
//! ```

use crate::fsio::{self, FsError};
use crate::paths::{safe_join, PathError};
use std::fs;
use std::path::{Path, PathBuf};
use teamd_core::{AgentId, TaskId, TeamId, ThreadId};
use thiserror::Error;

/// Subdirectories scaffolded under the team directory.
const SUBDIRS: [&str; 6] = [
    "tasks",
    "threads",
    "inboxes",
    "audit",
    "artifacts",
    "idempotency",
];

/// Errors resolving or scaffolding a workspace layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid team id: {0}")]
    InvalidTeamId(String),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved paths for one team's workspace directory.
#[derive(Debug, Clone)]
pub struct TeamLayout {
    root: PathBuf,
    team_id: TeamId,
    team_dir: PathBuf,
}

impl TeamLayout {
    /// Resolve the team directory under the workspace root via safe-join.
    ///
    /// The root must exist; the team directory need not yet.
    pub fn resolve(root: &Path, team_id: &TeamId) -> Result<Self, LayoutError> {
        if !team_id.is_valid() {
            return Err(LayoutError::InvalidTeamId(team_id.to_string()));
        }
        let team_dir = safe_join(root, team_id.as_str())?;
        Ok(Self {
            root: root.to_owned(),
            team_id: team_id.clone(),
            team_dir,
        })
    }

    /// Create the team directory and its subdirectory set, mode `0700`.
    pub fn scaffold(&self) -> Result<(), LayoutError> {
        fs::create_dir_all(&self.team_dir)?;
        fsio::set_private_dir(&self.team_dir)?;
        for sub in SUBDIRS {
            let dir = self.team_dir.join(sub);
            fs::create_dir_all(&dir)?;
            fsio::set_private_dir(&dir)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn team_dir(&self) -> &Path {
        &self.team_dir
    }

    pub fn team_file(&self) -> PathBuf {
        self.team_dir.join("team.json")
    }

    pub fn runtime_file(&self) -> PathBuf {
        self.team_dir.join("runtime.json")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.team_dir.join(".teamd.lock")
    }

    pub fn log_file(&self) -> PathBuf {
        self.team_dir.join("daemon.log")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.team_dir.join("tasks")
    }

    pub fn task_file(&self, id: &TaskId) -> PathBuf {
        self.tasks_dir().join(format!("{id}.json"))
    }

    pub fn threads_index(&self) -> PathBuf {
        self.team_dir.join("threads").join("index.json")
    }

    pub fn thread_log(&self, id: &ThreadId) -> PathBuf {
        self.team_dir.join("threads").join(format!("{id}.jsonl"))
    }

    pub fn inbox_file(&self, agent: &AgentId) -> PathBuf {
        self.team_dir.join("inboxes").join(format!("{agent}.json"))
    }

    pub fn inboxes_dir(&self) -> PathBuf {
        self.team_dir.join("inboxes")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.team_dir.join("audit").join("events.jsonl")
    }

    pub fn idempotency_file(&self) -> PathBuf {
        self.team_dir.join("idempotency").join("create-task.json")
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
