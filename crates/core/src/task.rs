// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled task records (§3 Scheduled Task, §4.2).

use crate::ids::{ObjectId, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Once,
    Periodic,
    Heartbeat,
}

/// `{id, kind, due_at, interval?, target_entity, callback}` (§3).
///
/// Tasks hold only the entity's id, never a strong reference — when the
/// entity is destroyed the registry cancels every task naming it (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub due_at_ms: u64,
    pub interval_ms: Option<u64>,
    pub target_entity: Option<ObjectId>,
    /// Opaque name the content unit (or driver) registered; the caller that
    /// drains fired tasks is responsible for interpreting it.
    pub callback: String,
    /// Monotonic tiebreaker for same-`due_at_ms` ordering (§4.2 "ties break
    /// by scheduling order").
    pub sequence: u64,
}

impl ScheduledTask {
    /// Compute the next `due_at_ms` for a periodic task using
    /// `prev_due + interval` (not `now + interval`), so missed intervals are
    /// dropped rather than coalesced (§4.2 "Drift").
    pub fn next_due(&self) -> Option<u64> {
        self.interval_ms.map(|interval| self.due_at_ms + interval)
    }
}
