// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path containment: lexical traversal rejection plus per-segment
//! symlink checks against the real path of the root.
//!
//! Neither check alone is sufficient: lexical normalization misses
//! symlinks that point outside the root, and realpath resolution alone
//! would silently follow `..` through them.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors from path containment checks.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Path escapes the workspace root: {0}")]
    Traversal(String),
    #[error("Symlink escapes the workspace root: {0}")]
    SymlinkEscape(String),
    #[error("IO error resolving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Join `relative` onto `root`, refusing anything that could land outside.
///
/// Rejects absolute inputs and any `..` component. Resolves the real path
/// of `root`, then walks every existing segment of the joined path; each
/// segment that is a symbolic link must resolve inside the root's real
/// path. Returns the lexically resolved absolute path (the final segments
/// need not exist).
pub fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let rel = Path::new(relative);
    if rel.is_absolute() {
        return Err(PathError::Traversal(relative.to_string()));
    }

    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(seg) => segments.push(seg),
            Component::CurDir => {}
            Component::ParentDir => return Err(PathError::Traversal(relative.to_string())),
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Traversal(relative.to_string()));
            }
        }
    }

    let real_root = root.canonicalize().map_err(|source| PathError::Io {
        path: root.to_owned(),
        source,
    })?;

    let mut resolved = real_root.clone();
    for seg in segments {
        resolved.push(seg);

        let meta = match resolved.symlink_metadata() {
            Ok(meta) => meta,
            // Nonexistent suffix: lexical containment already holds
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(PathError::Io {
                    path: resolved.clone(),
                    source,
                })
            }
        };

        if meta.file_type().is_symlink() {
            let target = resolved.canonicalize().map_err(|source| PathError::Io {
                path: resolved.clone(),
                source,
            })?;
            if !target.starts_with(&real_root) {
                return Err(PathError::SymlinkEscape(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

/// Normalize a task resource to the stored form: forward slashes, no
/// leading `./` or `/`, no trailing `/`, no `..` components. Returns
/// `None` for anything that does not normalize to a relative path.
pub fn normalize_resource(raw: &str) -> Option<String> {
    let slashed = raw.replace('\\', "/");
    let trimmed = slashed
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/');

    if trimmed.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    for part in trimmed.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Whether a stored resource prefix covers a normalized path.
///
/// A resource matches when it equals the path or is a strict parent.
pub fn resource_covers(resource: &str, path: &str) -> bool {
    path == resource
        || (path.len() > resource.len()
            && path.starts_with(resource)
            && path.as_bytes()[resource.len()] == b'/')
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
