// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy of §7, shared by every subsystem.
//!
//! Core code never throws across subsystem boundaries; it returns typed
//! results. Each crate defines its own narrow `thiserror` enum and converts
//! into [`DriverError`] at the daemon boundary, the way
//! `oj-daemon::lifecycle::LifecycleError` aggregates narrower I/O and
//! locking errors into one daemon-facing enum.

use thiserror::Error;

/// What kind of thing a [`DriverError::NotFound`] failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Object,
    Player,
    File,
}

crate::simple_display! {
    NotFoundKind {
        Object => "object",
        Player => "player",
        File => "file",
    }
}

/// The process-wide error taxonomy (§7).
#[derive(Debug, Error)]
pub enum DriverError {
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Reported to the originating builder; no state change.
    #[error("compile error in {path}: {line}:{column}: {message}")]
    ContentCompile { path: String, line: u32, column: u32, message: String },

    /// Logged, surfaced to the master's `on_runtime_error`, generic message
    /// to the player; process continues.
    #[error("runtime error in content: {0}")]
    ContentRuntime(String),

    /// Audit-logged, returned to caller as a typed result.
    #[error("permission denied: {action} on {target}")]
    PermissionDenied { action: String, target: String },

    /// Typed result to caller.
    #[error("{kind} not found: {name}")]
    NotFound { kind: NotFoundKind, name: String },

    /// Malformed frame; frame dropped, counter incremented.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Registry or Scheduler invariant violation: log, attempt shutdown, terminate.
    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

impl DriverError {
    pub fn not_found(kind: NotFoundKind, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }

    pub fn permission_denied(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self::PermissionDenied { action: action.into(), target: target.into() }
    }

    /// `true` for errors that should still let the process continue serving
    /// other sessions (everything except `Fatal`).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DriverError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_not_recoverable() {
        assert!(!DriverError::Fatal("registry corrupt".into()).is_recoverable());
    }

    #[test]
    fn not_found_is_recoverable() {
        assert!(DriverError::not_found(NotFoundKind::Object, "/std/room#9").is_recoverable());
    }

    #[test]
    fn not_found_display_includes_kind_and_name() {
        let err = DriverError::not_found(NotFoundKind::Player, "Bob");
        assert_eq!(err.to_string(), "player not found: Bob");
    }
}
