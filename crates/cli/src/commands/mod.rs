// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod agent;
pub mod daemon;
pub mod tasks;

use anyhow::{anyhow, Result};
use teamd_guard::{discover, Discovery, EnvSnapshot};

/// Discover the running daemon or fail with an actionable message.
pub fn require_discovery() -> Result<Discovery> {
    discover(&EnvSnapshot::from_env()).ok_or_else(|| {
        anyhow!(
            "no running teamd found (set TEAMD_URL/TEAMD_TOKEN or start \
             the daemon under TEAM_WORKSPACE_ROOT)"
        )
    })
}
