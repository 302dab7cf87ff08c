// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon discovery from environment hints, token files, and runtime
//! descriptors.
//!
//! Precedence: explicit environment beats the token file, which beats a
//! filesystem scan of `<root>/*/runtime.json` by modification time.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use teamd_core::{AgentId, TeamId};
use tracing::debug;

/// Environment hints, captured as an explicit struct so discovery stays
/// testable without touching process globals.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    /// `TEAM_WORKSPACE_ROOT`
    pub workspace_root: Option<PathBuf>,
    /// `TEAM_ID`
    pub team_id: Option<String>,
    /// `AGENT_ID`
    pub agent_id: Option<String>,
    /// `TEAMD_URL`
    pub url: Option<String>,
    /// `TEAMD_TOKEN`
    pub token: Option<String>,
    /// `TEAMD_TOKEN_FILE`
    pub token_file: Option<PathBuf>,
    /// `USER`, for the synthesized fallback agent id
    pub user: Option<String>,
}

impl EnvSnapshot {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            workspace_root: var("TEAM_WORKSPACE_ROOT").map(PathBuf::from),
            team_id: var("TEAM_ID"),
            agent_id: var("AGENT_ID"),
            url: var("TEAMD_URL"),
            token: var("TEAMD_TOKEN"),
            token_file: var("TEAMD_TOKEN_FILE").map(PathBuf::from),
            user: var("USER"),
        }
    }
}

/// A located daemon plus the identity to call it with.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub url: String,
    pub token: String,
    pub team_id: Option<TeamId>,
    pub agent_id: AgentId,
    pub workspace_root: PathBuf,
}

/// Token file contents: either a raw token on the first line or a JSON
/// object with `token` and an optional `url`.
#[derive(Debug, Deserialize)]
struct TokenFile {
    token: String,
    #[serde(default)]
    url: Option<String>,
}

/// Assemble discovery from the snapshot, filling gaps from the token
/// file and then from runtime descriptors. Returns `None` when no URL
/// or credential can be found anywhere.
pub fn discover(env: &EnvSnapshot) -> Option<Discovery> {
    let workspace_root = env
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let mut url = env.url.clone();
    let mut token = env.token.clone();

    if url.is_none() || token.is_none() {
        if let Some(path) = &env.token_file {
            if let Some(file) = read_token_file(path) {
                if token.is_none() {
                    token = Some(file.token);
                }
                if url.is_none() {
                    url = file.url;
                }
            }
        }
    }

    if url.is_none() || token.is_none() {
        if let Some(descriptor) = scan_runtime_descriptors(&workspace_root, env.team_id.as_deref())
        {
            if url.is_none() {
                url = Some(descriptor.url);
            }
            if token.is_none() {
                token = Some(descriptor.token);
            }
        }
    }

    let agent_id = env
        .agent_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("{}-auto", env.user.as_deref().unwrap_or("agent")));

    Some(Discovery {
        url: url?,
        token: token?,
        team_id: env.team_id.clone().map(TeamId::new),
        agent_id: AgentId::new(agent_id),
        workspace_root,
    })
}

fn read_token_file(path: &Path) -> Option<TokenFile> {
    let contents = fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<TokenFile>(trimmed) {
        return Some(parsed);
    }
    Some(TokenFile {
        token: trimmed.lines().next()?.trim().to_string(),
        url: None,
    })
}

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    url: String,
    token: String,
}

/// Scan `<root>/*/runtime.json` for the freshest descriptor. With a team
/// id set, only that team's descriptor is considered.
fn scan_runtime_descriptors(root: &Path, team_id: Option<&str>) -> Option<DescriptorFile> {
    let entries = fs::read_dir(root).ok()?;

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        if let Some(team) = team_id {
            if dir.file_name().and_then(|n| n.to_str()) != Some(team) {
                continue;
            }
        }
        let candidate = dir.join("runtime.json");
        let Ok(meta) = candidate.metadata() else {
            continue;
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if best.as_ref().is_none_or(|(ts, _)| modified > *ts) {
            best = Some((modified, candidate));
        }
    }

    let (_, path) = best?;
    debug!(path = %path.display(), "using runtime descriptor");
    let bytes = fs::read(&path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
