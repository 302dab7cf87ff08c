// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier validation and minting.

/// Check an identifier against the allowed character class `[A-Za-z0-9._-]`.
///
/// Applies to team, agent, task, and thread identifiers alike.
pub fn is_valid_id(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

/// Mint the next zero-padded numeric identifier for a prefix.
///
/// Scans `existing` for ids of the form `<prefix>-<digits>` and returns
/// `<prefix>-NNNN` where NNNN is one plus the maximum suffix seen
/// (`<prefix>-0001` when none exist). Ids that do not match the pattern
/// are ignored.
pub fn mint_numeric_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let max = existing
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-'))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}-{:04}", prefix, max + 1)
}

/// Mint a unique thread-message identifier.
pub fn mint_message_id() -> String {
    format!("msg-{}", nanoid::nanoid!(12))
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, and `Borrow<str>` implementations. The wrapper
/// serializes as a bare string.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the id matches the allowed character class.
            pub fn is_valid(&self) -> bool {
                crate::id::is_valid_id(&self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of the team owning a workspace directory.
    pub struct TeamId;
}

define_id! {
    /// Identifier of a participating agent process.
    pub struct AgentId;
}

define_id! {
    /// Task identifier of the form `task-NNNN`.
    pub struct TaskId;
}

define_id! {
    /// Thread identifier of the form `thread-NNNN`.
    pub struct ThreadId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
