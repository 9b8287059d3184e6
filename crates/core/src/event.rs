// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver-wide observability events.
//!
//! Every subsystem emits [`Event`]s for logging and for the audit log
//! (§4.8); nothing is replayed from them (unlike the teacher's
//! event-sourced `MaterializedState`) — persistence here is plain
//! save/load (§6), not a write-ahead log.

use crate::ids::{ObjectId, SessionId, ShadowType, TaskId};
use crate::permission::Level;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    EntityCloned { object_id: ObjectId, blueprint: String },
    EntityDestroyed { object_id: ObjectId },
    EntityMoved { object_id: ObjectId, from: Option<ObjectId>, to: Option<ObjectId> },

    TaskScheduled { id: TaskId, target: Option<ObjectId> },
    TaskFired { id: TaskId, target: Option<ObjectId> },
    TaskCancelled { id: TaskId },
    HeartbeatTick { registered: usize },

    SessionOpened { session: SessionId, remote_addr: String },
    SessionClosed { session: SessionId },
    SessionTakeover { session: SessionId, player: ObjectId },
    SessionReconnected { session: SessionId, player: ObjectId },

    LoginSucceeded { player: ObjectId, name: String },
    LoginFailed { name: String, reason: String },
    PlayerRegistered { player: ObjectId, name: String },

    CommandDispatched { session: SessionId, verb: String },
    CommandFailed { session: SessionId, verb: String, error: String },

    ShadowAttached { target: ObjectId, shadow_type: ShadowType },
    ShadowDetached { target: ObjectId, shadow_type: ShadowType },

    ContentReloaded { path: String },
    ContentReloadFailed { path: String, error: String },
    ContentDeleted { path: String },

    PermissionChecked { subject: String, action: String, target: String, success: bool },
    PermissionGranted { subject: String, level: Level },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::EntityCloned { .. } => "entity:cloned",
            Event::EntityDestroyed { .. } => "entity:destroyed",
            Event::EntityMoved { .. } => "entity:moved",
            Event::TaskScheduled { .. } => "task:scheduled",
            Event::TaskFired { .. } => "task:fired",
            Event::TaskCancelled { .. } => "task:cancelled",
            Event::HeartbeatTick { .. } => "heartbeat:tick",
            Event::SessionOpened { .. } => "session:opened",
            Event::SessionClosed { .. } => "session:closed",
            Event::SessionTakeover { .. } => "session:takeover",
            Event::SessionReconnected { .. } => "session:reconnected",
            Event::LoginSucceeded { .. } => "login:succeeded",
            Event::LoginFailed { .. } => "login:failed",
            Event::PlayerRegistered { .. } => "login:registered",
            Event::CommandDispatched { .. } => "command:dispatched",
            Event::CommandFailed { .. } => "command:failed",
            Event::ShadowAttached { .. } => "shadow:attached",
            Event::ShadowDetached { .. } => "shadow:detached",
            Event::ContentReloaded { .. } => "content:reloaded",
            Event::ContentReloadFailed { .. } => "content:reload_failed",
            Event::ContentDeleted { .. } => "content:deleted",
            Event::PermissionChecked { .. } => "permission:checked",
            Event::PermissionGranted { .. } => "permission:granted",
        }
    }

    pub fn log_summary(&self) -> String {
        match self {
            Event::EntityCloned { object_id, blueprint } => {
                format!("cloned {object_id} from {blueprint}")
            }
            Event::EntityDestroyed { object_id } => format!("destroyed {object_id}"),
            Event::EntityMoved { object_id, from, to } => {
                format!("moved {object_id} from {from:?} to {to:?}")
            }
            Event::TaskScheduled { id, target } => format!("scheduled {id} for {target:?}"),
            Event::TaskFired { id, target } => format!("fired {id} for {target:?}"),
            Event::TaskCancelled { id } => format!("cancelled {id}"),
            Event::HeartbeatTick { registered } => format!("tick over {registered} entities"),
            Event::SessionOpened { session, remote_addr } => {
                format!("session {session} opened from {remote_addr}")
            }
            Event::SessionClosed { session } => format!("session {session} closed"),
            Event::SessionTakeover { session, player } => {
                format!("session {session} took over {player}")
            }
            Event::SessionReconnected { session, player } => {
                format!("session {session} reconnected as {player}")
            }
            Event::LoginSucceeded { player, name } => format!("{name} logged in as {player}"),
            Event::LoginFailed { name, reason } => format!("{name} failed to log in: {reason}"),
            Event::PlayerRegistered { player, name } => format!("{name} registered as {player}"),
            Event::CommandDispatched { session, verb } => {
                format!("session {session} ran {verb}")
            }
            Event::CommandFailed { session, verb, error } => {
                format!("session {session} failed {verb}: {error}")
            }
            Event::ShadowAttached { target, shadow_type } => {
                format!("attached {shadow_type} to {target}")
            }
            Event::ShadowDetached { target, shadow_type } => {
                format!("detached {shadow_type} from {target}")
            }
            Event::ContentReloaded { path } => format!("reloaded {path}"),
            Event::ContentReloadFailed { path, error } => format!("reload of {path} failed: {error}"),
            Event::ContentDeleted { path } => format!("deleted {path}"),
            Event::PermissionChecked { subject, action, target, success } => {
                format!("{subject} {action} {target}: {}", if *success { "allowed" } else { "denied" })
            }
            Event::PermissionGranted { subject, level } => format!("{subject} granted {level}"),
        }
    }
}
