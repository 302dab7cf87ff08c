// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, single-instance locking, credential
//! minting, runtime-descriptor publication, and graceful shutdown.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use teamd_core::{TeamId, SCHEMA_VERSION};
use teamd_storage::{fsio, FsError, LayoutError, Store, StoreError, TeamLayout};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::server::{self, AppState};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace search root containing one directory per team
    pub workspace_root: PathBuf,
    /// Team this daemon serves
    pub team_id: TeamId,
    /// Loopback port to bind (0 = ephemeral)
    pub port: u16,
    /// Pre-minted credential; a fresh one is minted when absent
    pub token: Option<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `TEAM_WORKSPACE_ROOT` (default `.`), `TEAM_ID` (default `default`),
    /// `TEAMD_PORT` (default 0 = ephemeral), `TEAMD_TOKEN` (optional).
    pub fn load() -> Result<Self, LifecycleError> {
        let workspace_root = std::env::var("TEAM_WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let team_id = TeamId::new(
            std::env::var("TEAM_ID").unwrap_or_else(|_| "default".to_string()),
        );
        let port = std::env::var("TEAMD_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let token = std::env::var("TEAMD_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            workspace_root,
            team_id,
            port,
            token,
        })
    }
}

/// Lock file payload (`.teamd.lock`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockPayload {
    pid: i32,
    started_at: DateTime<Utc>,
    schema_version: u32,
}

/// Runtime descriptor published at `runtime.json`, mode 0600.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDescriptor {
    pub schema_version: u32,
    pub url: String,
    pub token: String,
    pub pid: u32,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(
        "teamd is already running for this team (pid {pid:?}); \
         remove {path} if the lock is stale"
    )]
    LockHeld { path: PathBuf, pid: Option<i32> },

    #[error("Failed to bind loopback listener on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Holds the `.teamd.lock` file; releases it on drop so both success and
/// error paths give the lock back.
#[derive(Debug)]
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Running daemon. Dropping without `shutdown()` still releases the lock
/// (via the guard) but skips the graceful listener stop.
#[derive(Debug)]
pub struct DaemonHandle {
    url: String,
    token: String,
    layout: TeamLayout,
    store: Arc<Store>,
    shutdown: Arc<Notify>,
    serve_task: JoinHandle<()>,
    _lock: LockGuard,
}

impl DaemonHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Stop the listener, remove the runtime descriptor, and release the
    /// lock.
    pub async fn shutdown(self) {
        info!("shutting down daemon");
        // notify_one stores a permit, so shutdown cannot race a listener
        // that has not reached its notified() await yet
        self.shutdown.notify_one();
        if let Err(e) = self.serve_task.await {
            warn!(error = %e, "listener task did not stop cleanly");
        }
        if let Err(e) = fs::remove_file(self.layout.runtime_file()) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(error = %e, "failed to remove runtime descriptor");
            }
        }
        // Lock released when the guard drops
        info!("daemon stopped");
    }
}

/// Start the daemon: scaffold the workspace, take the lock, mint the
/// credential, bind loopback, publish the runtime descriptor, and spawn
/// the listener.
pub async fn startup(config: &Config) -> Result<DaemonHandle, LifecycleError> {
    fs::create_dir_all(&config.workspace_root)?;
    let root = config.workspace_root.canonicalize()?;
    let layout = TeamLayout::resolve(&root, &config.team_id)?;
    layout.scaffold()?;

    let lock = acquire_lock(&layout)?;

    // Everything past the lock must release it on failure; LockGuard's
    // Drop handles that as long as errors propagate before the handle is
    // constructed.
    let token = match &config.token {
        Some(token) => token.clone(),
        None => mint_token(),
    };

    let store = Arc::new(Store::open(layout.clone())?);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port))
        .await
        .map_err(|source| LifecycleError::BindFailed {
            port: config.port,
            source,
        })?;
    let addr = listener.local_addr()?;
    let url = format!("http://{addr}");

    let descriptor = RuntimeDescriptor {
        schema_version: SCHEMA_VERSION,
        url: url.clone(),
        token: token.clone(),
        pid: std::process::id(),
    };
    fsio::write_json_atomic(&layout.runtime_file(), &descriptor)?;

    let shutdown = Arc::new(Notify::new());
    let router = server::router(AppState::new(Arc::clone(&store), &token));
    let stop = Arc::clone(&shutdown);
    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        stop.notified().await;
    });
    let serve_task = tokio::spawn(async move {
        if let Err(e) = serve.await {
            error!(error = %e, "listener failed");
        }
    });

    info!(url = %url, team = %config.team_id, "daemon ready");

    Ok(DaemonHandle {
        url,
        token,
        layout,
        store,
        shutdown,
        serve_task,
        _lock: lock,
    })
}

/// Acquire `.teamd.lock` with exclusive-create semantics.
///
/// If the file exists and its recorded pid is demonstrably dead (or the
/// payload is unreadable), the stale lock is removed and creation is
/// retried exactly once. A live holder fails with an actionable message.
fn acquire_lock(layout: &TeamLayout) -> Result<LockGuard, LifecycleError> {
    let path = layout.lock_file();
    match try_create_lock(&path) {
        Ok(guard) => Ok(guard),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let holder: Option<LockPayload> =
                fsio::read_json_opt(&path).ok().flatten();
            let holder_pid = holder.as_ref().map(|p| p.pid);
            let stale = match holder_pid {
                Some(pid) => !pid_alive(pid),
                None => true, // unreadable payload cannot name a live holder
            };
            if !stale {
                return Err(LifecycleError::LockHeld {
                    path,
                    pid: holder_pid,
                });
            }
            warn!(
                path = %path.display(),
                pid = ?holder_pid,
                "reclaiming stale lock"
            );
            fs::remove_file(&path)?;
            match try_create_lock(&path) {
                Ok(guard) => Ok(guard),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Lost the retry race to another starting daemon
                    Err(LifecycleError::LockHeld { path, pid: None })
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn try_create_lock(path: &std::path::Path) -> io::Result<LockGuard> {
    let payload = LockPayload {
        pid: std::process::id() as i32,
        started_at: Utc::now(),
        schema_version: SCHEMA_VERSION,
    };
    let mut line = serde_json::to_vec(&payload).map_err(io::Error::other)?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(LockGuard {
        path: path.to_owned(),
    })
}

/// Signal-0 probe: does the pid name a live process?
fn pid_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        // EPERM and friends mean the process exists but is not ours
        Err(_) => true,
    }
}

/// Mint a 256-bit random bearer credential, hex-encoded.
fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
