// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specifications for the team coordination daemon.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/dependencies.rs"]
mod dependencies;
#[path = "specs/fencing.rs"]
mod fencing;
#[path = "specs/guard.rs"]
mod guard;
#[path = "specs/idempotency.rs"]
mod idempotency;
#[path = "specs/locking.rs"]
mod locking;
#[path = "specs/recovery.rs"]
mod recovery;
