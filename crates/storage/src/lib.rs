// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the team coordination daemon.
//!
//! `fsio` and `paths` form the path-safe I/O layer; `layout` maps the
//! on-disk workspace shape; `store` is the authoritative model with its
//! serial mutation queue.

pub mod fsio;
pub mod layout;
pub mod paths;
mod store;

pub use fsio::FsError;
pub use layout::{LayoutError, TeamLayout};
pub use paths::{normalize_resource, safe_join, PathError};
pub use store::{
    CreateTask, CreatedTask, InboxPage, StartThread, Store, StoreError, TaskOutcome, ThreadTail,
    WriteDecision, DEFAULT_TTL_MS,
};
