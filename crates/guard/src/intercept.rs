// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-invocation gating and inbox summarization.
//!
//! File-mutating tools (`write`, `edit`, `bash`) are vetoed unless the
//! daemon confirms the caller holds a lease covering the target path.
//! Inbox events are condensed to a single line; the full body is never
//! forwarded to the host agent's steering channel.

use serde_json::Value;
use teamd_core::InboxEvent;
use tracing::debug;

use crate::client::GuardClient;
use crate::discovery::{discover, EnvSnapshot};

/// Tools whose invocations are gated on write permission.
pub const GUARDED_TOOLS: [&str; 3] = ["write", "edit", "bash"];

/// Outcome of an intercept decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Block { reason: String },
}

impl GateDecision {
    fn block(reason: impl Into<String>) -> Self {
        GateDecision::Block {
            reason: reason.into(),
        }
    }
}

/// Extract the path a tool invocation targets.
///
/// `write`/`edit` carry an explicit `file_path`; `bash` an optional
/// `path` defaulting to the current directory. Unguarded tools have no
/// target.
pub fn target_path(tool: &str, params: &Value) -> Option<String> {
    match tool {
        "write" | "edit" => params
            .get("file_path")
            .and_then(Value::as_str)
            .map(str::to_string),
        "bash" => Some(
            params
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or(".")
                .to_string(),
        ),
        _ => None,
    }
}

/// Decide whether a tool invocation may proceed.
///
/// Non-guarded tools pass through. For guarded tools: no interactive
/// surface blocks unconditionally; missing discovery blocks; otherwise
/// the daemon's can-write answer decides. Denies carry the daemon's
/// reason so the host agent can surface it.
pub async fn gate_tool(
    env: &EnvSnapshot,
    tool: &str,
    params: &Value,
    interactive: bool,
) -> GateDecision {
    if !GUARDED_TOOLS.contains(&tool) {
        return GateDecision::Allow;
    }
    if !interactive {
        return GateDecision::block(
            "no interactive surface available; file-mutating tools are blocked",
        );
    }
    let Some(path) = target_path(tool, params) else {
        return GateDecision::block(format!("{tool} invocation carries no target path"));
    };

    let Some(discovery) = discover(env) else {
        return GateDecision::block("write denied: missing_teamd_discovery");
    };
    let client = GuardClient::new(discovery);
    let decision = client.can_write(&path).await;
    debug!(tool, path, allow = decision.allow, reason = %decision.reason, "gate decision");
    if decision.allow {
        GateDecision::Allow
    } else {
        GateDecision::block(format!(
            "write to {path} denied: {} (claim a task whose lease covers this path)",
            decision.reason
        ))
    }
}

/// Condense an inbox event to one steering line.
///
/// The line never contains a newline and never includes the full event
/// body, e.g. `INBOX: task_completed task-0003 by worker_a`.
pub fn summarize_event(event: &InboxEvent) -> String {
    let reference = event
        .task_id
        .as_ref()
        .map(|t| t.to_string())
        .or_else(|| event.thread_id.as_ref().map(|t| t.to_string()));

    let line = match reference {
        Some(reference) => format!("INBOX: {} {} by {}", event.kind, reference, event.actor),
        None => format!("INBOX: {} by {}", event.kind, event.actor),
    };
    line.replace(['\n', '\r'], " ")
}

#[cfg(test)]
#[path = "intercept_tests.rs"]
mod tests;
