// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team coordination daemon (teamd).
//!
//! Background process that owns a team workspace directory and serves
//! the loopback HTTP surface agents coordinate through.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::Path;

use teamd_daemon::{lifecycle, Config, LifecycleError};
use teamd_storage::TeamLayout;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("teamd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("teamd {}", env!("CARGO_PKG_VERSION"));
                println!("Team coordination daemon - single writer of a team workspace");
                println!();
                println!("USAGE:");
                println!("    teamd");
                println!();
                println!("Configuration comes from the environment:");
                println!("    TEAM_WORKSPACE_ROOT   workspace search root (default .)");
                println!("    TEAM_ID               team to serve (default: default)");
                println!("    TEAMD_PORT            loopback port (default: ephemeral)");
                println!("    TEAMD_TOKEN           pre-minted bearer credential");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: teamd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // The log lives inside the team directory; resolve it up front so
    // rotation and the startup marker work before the daemon starts.
    std::fs::create_dir_all(&config.workspace_root)?;
    let layout = TeamLayout::resolve(&config.workspace_root.canonicalize()?, &config.team_id)?;
    std::fs::create_dir_all(layout.team_dir())?;
    let log_path = layout.log_file();

    rotate_log_if_needed(&log_path);
    write_startup_marker(&log_path)?;
    let _log_guard = setup_logging(&log_path)?;

    info!(team = %config.team_id, "starting daemon");

    let handle = match lifecycle::startup(&config).await {
        Ok(handle) => handle,
        Err(e @ LifecycleError::LockHeld { .. }) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&log_path, &e);
            error!(error = %e, "failed to start daemon");
            return Err(e.into());
        }
    };

    // Signal ready for wrappers waiting on startup
    println!("READY {}", handle.url());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    handle.shutdown().await;
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` to `daemon.log.1` to `.2` to `.3`, deleting the
/// oldest. Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker appended to the log before tracing is up, so wrappers
/// can find where the current startup attempt begins.
fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "--- teamd: starting (pid: {}) ---\n", std::process::id())
}

/// Write a startup error synchronously so it is visible even if the
/// process exits before the non-blocking appender flushes.
fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {error}");
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().ok_or("log path has no parent")?;
    let name = log_path.file_name().ok_or("log path has no file name")?;
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
