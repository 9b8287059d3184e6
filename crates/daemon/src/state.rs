// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DriverState`: the single owned instance of every process-wide subsystem
//! (§5 "Registry, Scheduler, Shadow Registry, Permissions, Active-Player
//! table are process-wide"). Exactly one logical thread — the orchestrator's
//! run loop — ever holds `&mut DriverState`, so no subsystem here takes its
//! own lock.

use crate::env::Config;
use crate::session::Session;
use indexmap::IndexMap;
use mud_content::{ContentCompiler, ContentSupervisor};
use mud_core::{normalize_subject, ContentPath, Event, ObjectId, SessionId, SessionToken, SystemClock, TaskId};
use mud_permissions::PermissionPolicy;
use mud_registry::{ObjectRegistry, ShadowRegistry};
use mud_scheduler::Scheduler;
use mud_storage::PlayerStore;
use std::sync::Arc;

/// `{name, version, tagline}` surfaced to content via `game_config()` (§4.10).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub name: String,
    pub version: String,
    pub tagline: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { name: "Unnamed Mud".into(), version: env!("CARGO_PKG_VERSION").into(), tagline: String::new() }
    }
}

/// A resume token issued over the `SESSION` subchannel (§4.4), bounding how
/// long it may be presented to skip re-authentication.
#[derive(Debug, Clone)]
pub struct SessionTokenRecord {
    pub entity: ObjectId,
    pub expires_at_ms: u64,
}

/// Owns every process-wide subsystem plus the active-player and session
/// tables (§4.9).
pub struct DriverState {
    pub registry: ObjectRegistry,
    pub shadows: ShadowRegistry,
    pub scheduler: Scheduler<SystemClock>,
    pub permissions: PermissionPolicy,
    pub players: PlayerStore,
    pub content: ContentSupervisor<SystemClock>,

    /// Case-insensitive name -> entity (§4.9 "Active-player table").
    pub active_players: IndexMap<String, ObjectId>,
    /// Entity -> currently bound session, present only while connected.
    pub player_sessions: IndexMap<ObjectId, SessionId>,
    pub sessions: IndexMap<SessionId, Session>,

    /// Observability events raised during the last dispatch, drained by the
    /// orchestrator's run loop after each turn (§4.8, §9 "events for logging
    /// and the audit log").
    pub events: Vec<Event>,

    /// Outstanding session-resume tokens, keyed by the opaque token string
    /// (§4.4 "the client may present it on reconnect to skip re-auth").
    pub session_tokens: IndexMap<SessionToken, SessionTokenRecord>,

    /// Entity -> in-flight debounced-save task, so a burst of mutating
    /// commands reschedules one task instead of stacking several (§4.5
    /// "Save trigger").
    pub pending_saves: IndexMap<ObjectId, TaskId>,

    pub master_path: ContentPath,
    pub login_daemon_path: ContentPath,
    pub start_room: ContentPath,
    pub game_config: GameConfig,
    pub mud_config: IndexMap<String, String>,
}

impl DriverState {
    /// `compiler` is the seam to the external world-content compiler (spec
    /// Non-goals (a)/(b)); `main.rs` supplies whatever backend is wired in
    /// for a given deployment.
    pub fn new(config: &Config, data_root: std::path::PathBuf, compiler: Arc<dyn ContentCompiler>) -> Self {
        Self {
            registry: ObjectRegistry::new(),
            shadows: ShadowRegistry::new(),
            scheduler: Scheduler::new(SystemClock).with_tick_period_ms(config.heartbeat_interval_ms),
            permissions: PermissionPolicy::new(),
            players: PlayerStore::new(data_root),
            content: ContentSupervisor::new(SystemClock, compiler),
            active_players: IndexMap::new(),
            player_sessions: IndexMap::new(),
            sessions: IndexMap::new(),
            events: Vec::new(),
            session_tokens: IndexMap::new(),
            pending_saves: IndexMap::new(),
            master_path: ContentPath::new(config.master_object.clone()),
            login_daemon_path: ContentPath::new("/secure/login"),
            start_room: ContentPath::new(config.start_room.clone()),
            game_config: GameConfig::default(),
            mud_config: IndexMap::new(),
        }
    }

    /// Register `entity` as the active player named `name` (§4.9 "Registration
    /// happens on completed login").
    pub fn register_active_player(&mut self, name: &str, entity: ObjectId) {
        self.active_players.insert(normalize_subject(name), entity);
    }

    /// Unregister the active player named `name` (§4.9 "unregistration on
    /// explicit quit").
    pub fn unregister_active_player(&mut self, name: &str) {
        if let Some(entity) = self.active_players.shift_remove(&normalize_subject(name)) {
            self.player_sessions.shift_remove(&entity);
        }
    }

    pub fn find_active_player(&self, name: &str) -> Option<&ObjectId> {
        self.active_players.get(&normalize_subject(name))
    }

    /// The active player named `name`, only if it currently has a bound
    /// session (§4.4 "session takeover" vs "reconnect").
    pub fn find_connected_player(&self, name: &str) -> Option<&ObjectId> {
        let entity = self.find_active_player(name)?;
        self.player_sessions.contains_key(entity).then_some(entity)
    }

    pub fn all_players(&self) -> Vec<ObjectId> {
        self.active_players.values().cloned().collect()
    }

    pub fn session_for(&self, entity: &ObjectId) -> Option<&SessionId> {
        self.player_sessions.get(entity)
    }

    /// Bind `session` to `entity`, replacing any prior binding for either
    /// side (§4.4 "the new session is bound" / `transfer_connection`).
    pub fn bind_session(&mut self, session_id: &SessionId, entity: ObjectId) {
        self.unbind_session(session_id);
        if let Some(stale) = self.player_sessions.insert(entity.clone(), session_id.clone()) {
            if let Some(stale_session) = self.sessions.get_mut(&stale) {
                stale_session.owner = crate::session::SessionOwner::LoggingIn;
            }
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.bind_player(entity);
        }
    }

    /// Detach whatever entity `session_id` is currently bound to, if any.
    pub fn unbind_session(&mut self, session_id: &SessionId) {
        if let Some(session) = self.sessions.get(session_id) {
            if let Some(entity) = session.player().cloned() {
                self.player_sessions.shift_remove(&entity);
            }
        }
    }
}
