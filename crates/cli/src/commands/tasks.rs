// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `teamctl tasks` - read-only task views.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use teamd_core::Task;

use super::require_discovery;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct TasksArgs {
    #[command(subcommand)]
    command: TasksCommand,
}

#[derive(Subcommand)]
enum TasksCommand {
    /// List every task in the workspace
    List,
}

pub async fn run(args: TasksArgs, output: OutputFormat) -> Result<()> {
    match args.command {
        TasksCommand::List => list(output).await,
    }
}

async fn list(output: OutputFormat) -> Result<()> {
    let discovery = require_discovery()?;

    let mut request = reqwest::Client::new()
        .get(format!("{}/v1/tasks", discovery.url.trim_end_matches('/')))
        .bearer_auth(&discovery.token);
    if let Some(team) = &discovery.team_id {
        request = request.query(&[("teamId", team.as_str())]);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("daemon rejected the request: {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body["tasks"])?),
        OutputFormat::Text => {
            let tasks: Vec<Task> = serde_json::from_value(body["tasks"].clone())?;
            if tasks.is_empty() {
                println!("no tasks");
                return Ok(());
            }
            for task in &tasks {
                println!("{}", task_row(task));
            }
        }
    }
    Ok(())
}

/// One fixed-width line per task: id, status, owner, title.
fn task_row(task: &Task) -> String {
    let owner = task
        .owner
        .as_ref()
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<10}  {:<12}  {:<12}  {}",
        task.id, task.status.to_string(), owner, task.title
    )
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
