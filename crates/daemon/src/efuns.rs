// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DriverContext`: the fixed extension surface content code calls (§4.10,
//! C10).
//!
//! Per §9's "singletons for daemons" redesign note, there is no process-wide
//! mutable global here — `DriverContext` borrows every subsystem out of
//! [`DriverState`] for the duration of one dispatch and is dropped when it
//! returns. It implements the narrow, object-safe [`Efuns`] trait content
//! classes are handed (`find_object`, `call_out`, `send`, …) and additionally
//! exposes the broader C10 catalog — the active-player table, persistence,
//! file, permissions, and config groups — as its own inherent methods,
//! called directly by the login state machine and command dispatcher rather
//! than routed through [`ContentClass`] callbacks.

use crate::session::{Session, SessionOwner};
use crate::state::{DriverState, SessionTokenRecord};
use mud_core::{
    normalize_subject, ContentPath, Efuns, Level, ObjectId, Shadow, ShadowType, SessionId, SessionToken,
    SuspendingRequest,
};
use mud_permissions::PermissionGrant;
use mud_storage::{PlayerRecord, StorageError};
use mud_wire::Frame;

/// One frame of the `this_player()`/`this_object()` ambient context (§4.10,
/// §9). The dispatcher pushes a frame before invoking content and pops it on
/// every exit path, including error returns.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub player: Option<ObjectId>,
    pub object: Option<ObjectId>,
}

/// A suspending efun request queued by content, to be serviced by an I/O
/// worker and resumed through the Scheduler (§5 "Suspension points", §9).
#[derive(Debug, Clone)]
pub struct PendingSuspension {
    pub target: ObjectId,
    pub request: SuspendingRequest,
    pub resume: String,
}

/// Borrows every subsystem a dispatch needs out of [`DriverState`]. Disjoint
/// field borrows let methods like [`DriverContext::clone_object`] hand the
/// Registry a *different* `&mut dyn Efuns` (built from this struct's other
/// fields) without aliasing the `&mut ObjectRegistry` it's also holding.
pub struct DriverContext<'a> {
    pub registry: &'a mut mud_registry::ObjectRegistry,
    pub shadows: &'a mut mud_registry::ShadowRegistry,
    pub scheduler: &'a mut mud_scheduler::Scheduler<mud_core::SystemClock>,
    pub permissions: &'a mut mud_permissions::PermissionPolicy,
    pub players: &'a mut mud_storage::PlayerStore,
    pub content: &'a mut mud_content::ContentSupervisor<mud_core::SystemClock>,
    pub sessions: &'a mut indexmap::IndexMap<SessionId, Session>,
    pub active_players: &'a mut indexmap::IndexMap<String, ObjectId>,
    pub player_sessions: &'a mut indexmap::IndexMap<ObjectId, SessionId>,
    pub context_stack: &'a mut Vec<ExecutionContext>,
    pub pending_suspensions: &'a mut Vec<PendingSuspension>,
    pub events: &'a mut Vec<mud_core::Event>,
    pub session_tokens: &'a mut indexmap::IndexMap<SessionToken, SessionTokenRecord>,
    pub pending_saves: &'a mut indexmap::IndexMap<ObjectId, mud_core::TaskId>,
    pub game_config: &'a crate::state::GameConfig,
    pub mud_config: &'a indexmap::IndexMap<String, String>,
    pub start_room: &'a ContentPath,
}

impl DriverState {
    /// Borrow every subsystem this dispatch needs as a [`DriverContext`].
    /// `context_stack` and `pending_suspensions` are owned by the caller
    /// (typically the dispatcher's per-command scratch state) and outlive
    /// any single `DriverContext` borrow.
    pub fn context<'a>(
        &'a mut self,
        context_stack: &'a mut Vec<ExecutionContext>,
        pending_suspensions: &'a mut Vec<PendingSuspension>,
    ) -> DriverContext<'a> {
        DriverContext {
            registry: &mut self.registry,
            shadows: &mut self.shadows,
            scheduler: &mut self.scheduler,
            permissions: &mut self.permissions,
            players: &mut self.players,
            content: &mut self.content,
            sessions: &mut self.sessions,
            active_players: &mut self.active_players,
            player_sessions: &mut self.player_sessions,
            context_stack,
            pending_suspensions,
            events: &mut self.events,
            session_tokens: &mut self.session_tokens,
            pending_saves: &mut self.pending_saves,
            game_config: &self.game_config,
            mud_config: &self.mud_config,
            start_room: &self.start_room,
        }
    }
}

/// RAII guard that pushes an [`ExecutionContext`] on construction and pops it
/// on drop, guaranteeing release on every exit path including an early
/// `return` or a panic unwind (§9 "this_player()/this_object() ambient
/// context").
pub struct ContextGuard<'a> {
    stack: &'a mut Vec<ExecutionContext>,
}

impl<'a> ContextGuard<'a> {
    pub fn push(stack: &'a mut Vec<ExecutionContext>, player: Option<ObjectId>, object: Option<ObjectId>) -> Self {
        stack.push(ExecutionContext { player, object });
        Self { stack }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

impl DriverContext<'_> {
    fn top(&self) -> Option<&ExecutionContext> {
        self.context_stack.last()
    }
}

/// Build a [`SubEfuns`] by reborrowing every `DriverContext` field except
/// the Registry. A macro rather than a method: expanding inline keeps each
/// field reborrow a direct field projection the borrow checker can see is
/// disjoint from a sibling `&mut ctx.registry` borrow in the same
/// expression. A method taking `&mut self` would instead be seen as
/// capturing the whole `DriverContext`, conflicting with that borrow.
///
/// `player`/`target` are taken by value rather than read from
/// `$ctx.context_stack` here, so a caller that's already pushed a
/// [`ContextGuard`] (itself holding `&mut $ctx.context_stack`) can still
/// build a `SubEfuns` without a second, conflicting borrow of that field.
macro_rules! sub_efuns {
    ($ctx:expr, $player:expr, $target:expr) => {
        SubEfuns {
            scheduler: &mut *$ctx.scheduler,
            sessions: &mut *$ctx.sessions,
            player_sessions: &mut *$ctx.player_sessions,
            shadows: &mut *$ctx.shadows,
            pending_suspensions: &mut *$ctx.pending_suspensions,
            player: $player,
            target: $target,
        }
    };
}
pub(crate) use sub_efuns;

impl Efuns for DriverContext<'_> {
    fn find_object(&mut self, path_or_id: &str) -> Option<ObjectId> {
        self.registry.find(path_or_id).map(|e| e.object_id.clone())
    }

    fn clone_object(&mut self, path: &str) -> Option<ObjectId> {
        let path = ContentPath::new(path);
        let player = self.context_stack.last().and_then(|frame| frame.player.clone());
        let mut sub = sub_efuns!(self, player, None);
        self.registry.clone_of(&path, &mut sub).ok()
    }

    fn this_player(&self) -> Option<ObjectId> {
        self.top().and_then(|ctx| ctx.player.clone())
    }

    fn this_object(&self) -> Option<ObjectId> {
        self.top().and_then(|ctx| ctx.object.clone())
    }

    fn call_out(&mut self, target: &ObjectId, callback: &str, delay_ms: u64) -> String {
        self.scheduler.call_out(Some(target.clone()), callback, delay_ms).as_str().to_string()
    }

    fn call_out_every(&mut self, target: &ObjectId, callback: &str, interval_ms: u64) -> String {
        self.scheduler.call_out_every(Some(target.clone()), callback, interval_ms).as_str().to_string()
    }

    fn remove_call_out(&mut self, task_id: &str) -> bool {
        self.scheduler.cancel(&mud_core::TaskId::new(task_id))
    }

    fn time(&self) -> u64 {
        mud_core::Clock::epoch_ms(&mud_core::SystemClock)
    }

    fn send(&mut self, target: &ObjectId, message: &str) {
        send_to(self.player_sessions, self.sessions, target, message);
    }

    fn call_suspending(&mut self, target: &ObjectId, request: SuspendingRequest, resume: &str) {
        self.pending_suspensions.push(PendingSuspension { target: target.clone(), request, resume: resume.into() });
    }

    fn remove_shadow(&mut self, target: &ObjectId, shadow_type: &str) -> bool {
        self.shadows.remove_shadow(target, &ShadowType::new(shadow_type)).is_ok()
    }
}

fn send_to(
    player_sessions: &indexmap::IndexMap<ObjectId, SessionId>,
    sessions: &mut indexmap::IndexMap<SessionId, Session>,
    target: &ObjectId,
    message: &str,
) {
    let Some(session_id) = player_sessions.get(target) else { return };
    if let Some(session) = sessions.get_mut(session_id) {
        session.outbound.push(Frame::text(message));
    }
}

/// A narrower [`Efuns`] built from every [`DriverContext`] field except the
/// Registry (see the [`sub_efuns`] macro). `find_object`/`clone_object`
/// are unavailable here since the Registry is exclusively borrowed by the
/// in-flight Registry call this is passed into; a callback that needs one
/// must do so from a later hook instead. `player`/`target` are plain
/// snapshots rather than a borrow of `context_stack`, so building one
/// doesn't conflict with a live [`ContextGuard`] over the same stack.
pub(crate) struct SubEfuns<'a> {
    pub(crate) scheduler: &'a mut mud_scheduler::Scheduler<mud_core::SystemClock>,
    pub(crate) sessions: &'a mut indexmap::IndexMap<SessionId, Session>,
    pub(crate) player_sessions: &'a mut indexmap::IndexMap<ObjectId, SessionId>,
    pub(crate) shadows: &'a mut mud_registry::ShadowRegistry,
    pub(crate) pending_suspensions: &'a mut Vec<PendingSuspension>,
    pub(crate) player: Option<ObjectId>,
    pub(crate) target: Option<ObjectId>,
}

impl Efuns for SubEfuns<'_> {
    fn find_object(&mut self, _path_or_id: &str) -> Option<ObjectId> {
        None
    }

    fn clone_object(&mut self, _path: &str) -> Option<ObjectId> {
        None
    }

    fn this_player(&self) -> Option<ObjectId> {
        self.player.clone()
    }

    fn this_object(&self) -> Option<ObjectId> {
        self.target.clone()
    }

    fn call_out(&mut self, target: &ObjectId, callback: &str, delay_ms: u64) -> String {
        self.scheduler.call_out(Some(target.clone()), callback, delay_ms).as_str().to_string()
    }

    fn call_out_every(&mut self, target: &ObjectId, callback: &str, interval_ms: u64) -> String {
        self.scheduler.call_out_every(Some(target.clone()), callback, interval_ms).as_str().to_string()
    }

    fn remove_call_out(&mut self, task_id: &str) -> bool {
        self.scheduler.cancel(&mud_core::TaskId::new(task_id))
    }

    fn time(&self) -> u64 {
        mud_core::Clock::epoch_ms(&mud_core::SystemClock)
    }

    fn send(&mut self, target: &ObjectId, message: &str) {
        send_to(self.player_sessions, self.sessions, target, message);
    }

    fn call_suspending(&mut self, target: &ObjectId, request: SuspendingRequest, resume: &str) {
        self.pending_suspensions.push(PendingSuspension { target: target.clone(), request, resume: resume.into() });
    }

    fn remove_shadow(&mut self, target: &ObjectId, shadow_type: &str) -> bool {
        self.shadows.remove_shadow(target, &ShadowType::new(shadow_type)).is_ok()
    }
}

/// The broader C10 catalog beyond the [`Efuns`] trait: active-player table,
/// persistence, file, permissions, messaging, shadow, and config groups.
impl DriverContext<'_> {
    // --- Object: active-player table ---

    pub fn register_active_player(&mut self, name: &str, entity: ObjectId) {
        self.active_players.insert(normalize_subject(name), entity);
    }

    pub fn unregister_active_player(&mut self, name: &str) {
        if let Some(entity) = self.active_players.shift_remove(&normalize_subject(name)) {
            self.player_sessions.shift_remove(&entity);
        }
    }

    pub fn find_active_player(&self, name: &str) -> Option<ObjectId> {
        self.active_players.get(&normalize_subject(name)).cloned()
    }

    pub fn find_connected_player(&self, name: &str) -> Option<ObjectId> {
        let entity = self.find_active_player(name)?;
        self.player_sessions.contains_key(&entity).then_some(entity)
    }

    pub fn all_players(&self) -> Vec<ObjectId> {
        self.active_players.values().cloned().collect()
    }

    /// Rebind `session` to `entity`, detaching whatever either side was
    /// previously bound to (§4.4 session takeover, §4.10 `transfer_connection`).
    pub fn transfer_connection(&mut self, session_id: &SessionId, entity: ObjectId) {
        if let Some(session) = self.sessions.get(session_id) {
            if let Some(previous) = session.player() {
                self.player_sessions.shift_remove(previous);
            }
        }
        if let Some(stale_session) = self.player_sessions.insert(entity.clone(), session_id.clone()) {
            if let Some(stale) = self.sessions.get_mut(&stale_session) {
                stale.owner = SessionOwner::LoggingIn;
            }
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.bind_player(entity);
        }
    }

    /// Issue a fresh session-resume token for `entity`, valid for `ttl_ms`
    /// (§4.4 "opaque, TTL-bounded").
    pub fn issue_session_token(&mut self, entity: ObjectId, ttl_ms: u64) -> (SessionToken, u64) {
        let token = SessionToken::new(uuid::Uuid::new_v4().to_string());
        let expires_at_ms = mud_core::Clock::epoch_ms(&mud_core::SystemClock) + ttl_ms;
        self.session_tokens.insert(token.clone(), SessionTokenRecord { entity, expires_at_ms });
        (token, expires_at_ms)
    }

    /// Consume `token` if it is known and unexpired, returning the entity it
    /// resolves to (§4.4 "tokens that are expired or unknown cause a
    /// `session_invalid` reply"). Tokens are single-use: a resolved token is
    /// removed, matching the one-shot resume the client performs right after
    /// reconnecting.
    pub fn resolve_session_token(&mut self, token: &str) -> Option<ObjectId> {
        let record = self.session_tokens.shift_remove(token)?;
        (record.expires_at_ms >= mud_core::Clock::epoch_ms(&mud_core::SystemClock)).then_some(record.entity)
    }

    // --- Persistence ---

    pub fn save_player(&mut self, record: &PlayerRecord) -> Result<(), StorageError> {
        self.players.save_player(record)
    }

    /// Arm (or reschedule) a debounced save for `entity` (§4.5 "Save
    /// trigger"): a command flagged as mutating persistent state cancels
    /// whatever save task is already pending for this entity and schedules a
    /// fresh one, so a burst of mutating commands in quick succession still
    /// writes only once.
    pub fn trigger_save_debounce(&mut self, entity: &ObjectId) {
        if let Some(existing) = self.pending_saves.shift_remove(entity) {
            self.scheduler.cancel(&existing);
        }
        let delay_ms = crate::env::save_debounce().as_millis() as u64;
        let task_id = self.scheduler.call_out(Some(entity.clone()), crate::session::SAVE_DEBOUNCE_CALLBACK, delay_ms);
        self.pending_saves.insert(entity.clone(), task_id);
    }

    /// Build an updated [`PlayerRecord`] from `entity`'s live state and
    /// persist it, preserving whatever password hash and administrator flag
    /// its last-saved record carried (§4.5 step 6, §6 "Persisted state
    /// layout"). Called once the debounce window in
    /// [`Self::trigger_save_debounce`] elapses.
    pub fn save_player_snapshot(&mut self, entity: &ObjectId) -> Result<(), StorageError> {
        let Some(live) = self.registry.find(entity.as_str()) else { return Ok(()) };
        let Some(name) = live.state.get("name").and_then(|v| v.as_str()).map(str::to_string) else { return Ok(()) };
        let location = live.environment.as_ref().map(|id| id.as_str().to_string()).unwrap_or_default();
        let properties = live.state.clone();
        let inventory: Vec<String> = live.inventory.iter().map(|id| id.as_str().to_string()).collect();

        let mut record = self.players.load_player(&name)?;
        record.location = location;
        record.state.properties = properties;
        record.inventory = (!inventory.is_empty()).then_some(inventory);
        record.saved_at = chrono::Utc::now();
        self.players.save_player(&record)
    }

    pub fn player_exists(&self, name: &str) -> bool {
        self.players.player_exists(name)
    }

    pub fn load_player_data(&self, name: &str) -> Result<PlayerRecord, StorageError> {
        self.players.load_player(name)
    }

    pub fn list_players(&self) -> Result<Vec<String>, StorageError> {
        self.players.list_players()
    }

    /// Number of registered players, used by the login daemon to grant the
    /// first-ever registration Administrator (§4.4).
    pub fn player_count(&self) -> Result<usize, StorageError> {
        self.players.player_count()
    }

    pub fn save_data(&mut self, namespace: &str, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        self.players.write_data(namespace, key, value)
    }

    pub fn load_data(&self, namespace: &str, key: &str) -> Result<serde_json::Value, StorageError> {
        self.players.read_data(namespace, key)
    }

    pub fn list_data_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        self.players.list_data_keys(namespace)
    }

    pub fn delete_data(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.players.delete_data(namespace, key)
    }

    // --- File (every file efun re-enters the permission gate, §4.10) ---

    pub fn read_file(&mut self, subject: Option<&str>, path: &str) -> Result<String, DriverFileError> {
        self.permissions.check_read(subject, path);
        std::fs::read_to_string(path).map_err(DriverFileError::Io)
    }

    pub fn write_file(&mut self, subject: Option<&str>, path: &str, data: &str) -> Result<(), DriverFileError> {
        if !self.permissions.check_write(subject, path) {
            return Err(DriverFileError::PermissionDenied);
        }
        std::fs::write(path, data).map_err(DriverFileError::Io)
    }

    pub fn read_dir(&mut self, subject: Option<&str>, path: &str) -> Result<Vec<String>, DriverFileError> {
        self.permissions.check_read(subject, path);
        let entries = std::fs::read_dir(path).map_err(DriverFileError::Io)?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(DriverFileError::Io)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    pub fn file_stat(&mut self, subject: Option<&str>, path: &str) -> Result<std::fs::Metadata, DriverFileError> {
        self.permissions.check_read(subject, path);
        std::fs::metadata(path).map_err(DriverFileError::Io)
    }

    // --- Permissions ---

    pub fn set_permission_level(&mut self, actor: Option<&str>, name: &str, level: Level) {
        self.permissions.grant(PermissionGrant::new(name, level));
        self.permissions.record_grant(actor, name);
    }

    /// Snapshot every grant to the data store under the `system` namespace
    /// (§4.10 `save_permissions`; the persisted file format itself is an
    /// external collaborator, so this only needs a stable shape this driver
    /// can also load back).
    pub fn save_permissions(&mut self) -> Result<(), StorageError> {
        let grants: Vec<&PermissionGrant> = self.permissions.grants().collect();
        let value = serde_json::to_value(grants).unwrap_or(serde_json::Value::Null);
        self.players.write_data("system", "permissions", &value)
    }

    /// Restore every grant snapshotted by [`Self::save_permissions`] (§4.9
    /// `starting` step 5). A missing `system/permissions` key means a fresh
    /// install; that is not an error.
    pub fn load_permissions(&mut self) -> Result<(), StorageError> {
        let value = match self.players.read_data("system", "permissions") {
            Ok(value) => value,
            Err(StorageError::KeyNotFound { .. }) => return Ok(()),
            Err(err) => return Err(err),
        };
        let grants: Vec<PermissionGrant> = serde_json::from_value(value).unwrap_or_default();
        for grant in grants {
            self.permissions.grant(grant);
        }
        Ok(())
    }

    pub fn level_of(&self, subject: Option<&str>) -> Level {
        self.permissions.level_of(subject)
    }

    // --- Messaging ---

    pub fn send_message(&mut self, target: &ObjectId, message: &str) {
        send_to(self.player_sessions, self.sessions, target, message);
    }

    /// Push a raw frame (typically a subchannel control frame, e.g.
    /// `SESSION`) straight to `session_id`'s outbound queue, bypassing the
    /// active-player table — used while a session is still authenticating,
    /// before it has a bound entity (§4.4).
    pub fn send_frame_to_session(&mut self, session_id: &SessionId, frame: Frame) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.outbound.push(frame);
        }
    }

    /// Record an observability event for the orchestrator to drain (§4.8, §9).
    pub fn emit_event(&mut self, event: mud_core::Event) {
        self.events.push(event);
    }

    pub fn execute_command(&mut self, entity: &ObjectId, line: &str, level: Level) {
        crate::dispatch::execute_line(self, entity, line, level);
    }

    // --- Shadows ---

    pub fn add_shadow(&mut self, target: ObjectId, shadow: Shadow) -> Result<(), mud_registry::RegistryError> {
        self.shadows.add_shadow(target, shadow)
    }

    // --- Config ---

    pub fn game_config(&self) -> crate::state::GameConfig {
        self.game_config.clone()
    }

    pub fn get_mud_config(&self, key: &str) -> Option<&str> {
        self.mud_config.get(key).map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverFileError {
    #[error("permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
