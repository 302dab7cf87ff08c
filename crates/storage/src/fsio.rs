// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON writes, line-delimited appends, and tolerant tail reads.
//!
//! A newline commits a record; bytes after the last newline are
//! uncommitted and are discarded on read. JSON records are written via a
//! sibling temp file and rename, so the destination is always either the
//! prior contents or the new fully-formed record.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the path-safe I/O layer.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid line {line} in {path}: {message}")]
    InvalidLine {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Write a JSON record atomically with mode `0600`.
///
/// Creates missing parent directories, writes a sibling `.tmp` file,
/// fsyncs it, renames over the destination, and best-effort fsyncs the
/// parent directory. The temp file is removed on any failure.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_sibling(path);
    let result = (|| -> Result<(), FsError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)?;
        serde_json::to_writer(&mut file, value)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        sync_parent_dir(path);
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Append a record as a single JSON line with a trailing newline, flushed.
///
/// The file is created with mode `0600` if absent.
pub fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(())
}

/// Read all committed records from a line-delimited JSON file.
///
/// A missing file reads as empty. If the last byte is not a newline, the
/// trailing fragment is a crash-interrupted append and is silently
/// discarded. Any newline-terminated line that fails to parse fails the
/// whole call with [`FsError::InvalidLine`].
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, FsError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let committed = match bytes.iter().rposition(|&b| b == b'\n') {
        Some(last_newline) => &bytes[..=last_newline],
        None => {
            if !bytes.is_empty() {
                debug!(path = %path.display(), "discarding unterminated trailing fragment");
            }
            return Ok(Vec::new());
        }
    };
    if committed.len() < bytes.len() {
        debug!(path = %path.display(), "discarding unterminated trailing fragment");
    }

    let mut records = Vec::new();
    for (idx, line) in committed.split(|&b| b == b'\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_slice(line).map_err(|e| FsError::InvalidLine {
            path: path.to_owned(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read a JSON record, returning `None` for a missing file.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FsError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Set mode `0700` on a directory.
pub fn set_private_dir(path: &Path) -> Result<(), FsError> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

/// Set mode `0600` on a file.
pub fn set_private_file(path: &Path) -> Result<(), FsError> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Flush the parent directory so the rename survives power loss.
/// Best-effort: some filesystems reject directory fsync.
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(test)]
#[path = "fsio_tests.rs"]
mod tests;
