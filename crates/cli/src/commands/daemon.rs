// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `teamctl daemon` - daemon status views.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use super::require_discovery;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    command: DaemonCommand,
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Show whether the daemon is reachable and which version it runs
    Status,
}

pub async fn run(args: DaemonArgs, output: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Status => status(output).await,
    }
}

async fn status(output: OutputFormat) -> Result<()> {
    let discovery = require_discovery()?;

    let health: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/healthz", discovery.url.trim_end_matches('/')))
        .send()
        .await
        .map_err(|e| anyhow!("daemon at {} is not responding: {e}", discovery.url))?
        .json()
        .await?;

    let version = health["version"].as_str().unwrap_or("unknown");
    match output {
        OutputFormat::Text => {
            println!("teamd running at {}", discovery.url);
            println!("  version: {version}");
            println!("  agent:   {}", discovery.agent_id);
            if let Some(team) = &discovery.team_id {
                println!("  team:    {team}");
            }
        }
        OutputFormat::Json => {
            let payload = json!({
                "url": discovery.url,
                "status": health["status"],
                "version": version,
                "teamId": discovery.team_id,
                "agentId": discovery.agent_id,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}
