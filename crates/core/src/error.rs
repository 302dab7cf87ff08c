// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire error codes and their HTTP status mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every error code the daemon can put on the wire, with its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input (400)
    InvalidTeamId,
    InvalidAgentId,
    InvalidTask,
    InvalidThreadMessage,
    InvalidJson,
    // Authority (401)
    Unauthorized,
    // Lease (403)
    LeaseExpired,
    LeaseHolderMismatch,
    // Absence (404)
    TeamNotFound,
    TaskNotFound,
    ThreadNotFound,
    NotFound,
    // Conflict (409)
    TaskNotClaimable,
    TaskNotInProgress,
    EpochMismatch,
    // I/O internals (500)
    PathTraversal,
    SymlinkEscape,
    InvalidLine,
    InternalError,
}

impl ErrorCode {
    /// The HTTP status this code is carried with.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::InvalidTeamId
            | ErrorCode::InvalidAgentId
            | ErrorCode::InvalidTask
            | ErrorCode::InvalidThreadMessage
            | ErrorCode::InvalidJson => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::LeaseExpired | ErrorCode::LeaseHolderMismatch => 403,
            ErrorCode::TeamNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::ThreadNotFound
            | ErrorCode::NotFound => 404,
            ErrorCode::TaskNotClaimable
            | ErrorCode::TaskNotInProgress
            | ErrorCode::EpochMismatch => 409,
            ErrorCode::PathTraversal
            | ErrorCode::SymlinkEscape
            | ErrorCode::InvalidLine
            | ErrorCode::InternalError => 500,
        }
    }

    /// The wire spelling, e.g. `TASK_NOT_CLAIMABLE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTeamId => "INVALID_TEAM_ID",
            ErrorCode::InvalidAgentId => "INVALID_AGENT_ID",
            ErrorCode::InvalidTask => "INVALID_TASK",
            ErrorCode::InvalidThreadMessage => "INVALID_THREAD_MESSAGE",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::LeaseExpired => "LEASE_EXPIRED",
            ErrorCode::LeaseHolderMismatch => "LEASE_HOLDER_MISMATCH",
            ErrorCode::TeamNotFound => "TEAM_NOT_FOUND",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::ThreadNotFound => "THREAD_NOT_FOUND",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TaskNotClaimable => "TASK_NOT_CLAIMABLE",
            ErrorCode::TaskNotInProgress => "TASK_NOT_IN_PROGRESS",
            ErrorCode::EpochMismatch => "EPOCH_MISMATCH",
            ErrorCode::PathTraversal => "PATH_TRAVERSAL",
            ErrorCode::SymlinkEscape => "SYMLINK_ESCAPE",
            ErrorCode::InvalidLine => "INVALID_LINE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
