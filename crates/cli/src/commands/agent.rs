// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `teamctl agent` - environment helpers for agent processes.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use teamd_guard::Discovery;

use super::require_discovery;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    command: AgentCommand,
}

#[derive(Subcommand)]
enum AgentCommand {
    /// Print the environment an agent needs to reach the daemon
    Env,
}

pub fn run(args: AgentArgs, output: OutputFormat) -> Result<()> {
    match args.command {
        AgentCommand::Env => env(output),
    }
}

fn env(output: OutputFormat) -> Result<()> {
    let discovery = require_discovery()?;
    match output {
        OutputFormat::Text => {
            for line in env_lines(&discovery) {
                println!("{line}");
            }
        }
        OutputFormat::Json => {
            let payload = json!({
                "TEAMD_URL": discovery.url,
                "TEAMD_TOKEN": discovery.token,
                "TEAM_ID": discovery.team_id,
                "AGENT_ID": discovery.agent_id,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

/// Shell-sourceable export lines for the discovered daemon.
fn env_lines(discovery: &Discovery) -> Vec<String> {
    let mut lines = vec![
        format!("export TEAMD_URL={}", discovery.url),
        format!("export TEAMD_TOKEN={}", discovery.token),
    ];
    if let Some(team) = &discovery.team_id {
        lines.push(format!("export TEAM_ID={team}"));
    }
    lines.push(format!("export AGENT_ID={}", discovery.agent_id));
    lines
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
