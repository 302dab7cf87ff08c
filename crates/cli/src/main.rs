// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! teamctl - read-only admin views over a running teamd

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "teamctl",
    version,
    about = "Admin views over the team coordination daemon"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon management
    Daemon(commands::daemon::DaemonArgs),
    /// Agent environment helpers
    Agent(commands::agent::AgentArgs),
    /// Task views
    Tasks(commands::tasks::TasksArgs),
}

#[tokio::main]
async fn main() {
    // Any failure exits 1; help and version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            std::process::exit(code);
        }
    };
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Daemon(args) => commands::daemon::run(args, cli.output).await,
        Commands::Agent(args) => commands::agent::run(args, cli.output),
        Commands::Tasks(args) => commands::tasks::run(args, cli.output).await,
    }
}
