// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes used across the driver.
//!
//! Object and content-unit identifiers are variable-length path strings
//! (`/std/room`, `/std/room#42`), so they are plain `String` newtypes rather
//! than the fixed-width inline buffer a random-token id would use.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Logical path into the content tree, e.g. `/std/room`.
    pub struct ContentPath
}

string_id! {
    /// Identity of an entity: a blueprint path, or `path#n` for a clone.
    pub struct ObjectId
}

string_id! {
    /// A connected client.
    pub struct SessionId
}

string_id! {
    /// An opaque, TTL-bounded session-resume token (§4.4).
    pub struct SessionToken
}

string_id! {
    /// Discriminates overlapping shadows on the same target (§4.6).
    pub struct ShadowType
}

string_id! {
    /// A scheduled task handle (§4.2).
    pub struct TaskId
}

impl ObjectId {
    /// Build the id of a freshly cloned instance: `path#<monotonic>`.
    pub fn for_clone(path: &ContentPath, sequence: u64) -> Self {
        Self(format!("{path}#{sequence}"))
    }

    /// Blueprint ids are bare content paths.
    pub fn for_blueprint(path: &ContentPath) -> Self {
        Self(path.0.clone())
    }

    /// `true` if this id names a clone (`path#n`) rather than a blueprint.
    pub fn is_clone(&self) -> bool {
        self.0.contains('#')
    }
}

/// Process-wide monotonic counter used to mint clone suffixes.
///
/// One instance lives in the registry; tests construct independent counters
/// so clone ids don't leak across test cases.
#[derive(Debug, Default)]
pub struct CloneCounter(AtomicU64);

impl CloneCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
