// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login state machine (§4.4, C4).
//!
//! Two front doors lead to the same `complete_login` core: a line oriented
//! text flow (`name → password → confirm_password → email → gender →
//! playing`) driven by [`LoginSession`]/[`handle_line`], and a one-shot
//! structured flow over `AUTH_REQ`/`AUTH` driven by [`handle_auth_request`].
//! Neither owns the socket; both only touch [`DriverContext`] and return an
//! outcome for the orchestrator to act on.

use crate::efuns::DriverContext;
use crate::env;
use mud_core::{Efuns, Level, ObjectId};
use mud_storage::{is_valid_name, normalize_name, PlayerRecord, StoredPassword};
use mud_wire::{AuthErrorCode, AuthRequest, AuthRequestType, AuthResponse, Frame, SessionMessage, Subchannel};

/// Reserved `Entity.state` key holding the disconnect-timeout task id while
/// a player is disconnected but still reserved (§4.3, §4.9).
pub const DISCONNECT_TASK_KEY: &str = "__disconnect_task";

/// Reserved `Entity.state` key holding the room a disconnected player was
/// standing in, restored on reconnect (§4.4 "moved back ... to its previous
/// location").
pub const PREVIOUS_LOCATION_KEY: &str = "__previous_location";

/// Per-session scratch state for the text login flow. Not part of
/// [`crate::session::Session`] itself, since only a session still
/// authenticating needs one; the orchestrator drops it the moment a
/// [`LoginOutcome::Authenticated`] is returned.
#[derive(Debug, Clone)]
pub struct LoginSession {
    state: LoginState,
    name: Option<String>,
    password: Option<String>,
    email: Option<String>,
    gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginState {
    Name,
    Password { registering: bool },
    ConfirmPassword,
    Email,
    Gender,
}

impl Default for LoginSession {
    fn default() -> Self {
        Self { state: LoginState::Name, name: None, password: None, email: None, gender: None }
    }
}

impl LoginSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line to send the client to prompt for the current state.
    pub fn prompt(&self) -> &'static str {
        match self.state {
            LoginState::Name => "What name do you want to use?",
            LoginState::Password { registering: true } => "Choose a password (at least 6 characters):",
            LoginState::Password { registering: false } => "Password:",
            LoginState::ConfirmPassword => "Confirm your password:",
            LoginState::Email => "Email address (optional, press enter to skip):",
            LoginState::Gender => "Gender (1=male, 2=female, or type your own, press enter to skip):",
        }
    }
}

/// What the orchestrator should do after feeding a line or an `AUTH_REQ`
/// into the login flow.
pub enum LoginOutcome {
    /// Send this line back and keep waiting in the text flow.
    Reprompt(String),
    /// Authentication succeeded; `stale_session` is the previous session
    /// bound to the same player if a takeover displaced it, and
    /// `reconnected` distinguishes a reconnect from a fresh bind (§4.9
    /// "Registration happens on completed login").
    Authenticated { entity: ObjectId, welcome: String, stale_session: Option<mud_core::SessionId>, reconnected: bool },
    /// The structured flow's `AUTH` reply.
    Auth(AuthResponse),
}

/// Feed one line of text input through the flow for a session currently in
/// `login`. Mutates `login` in place; returns what the orchestrator should
/// do with the result.
pub fn handle_line(ctx: &mut DriverContext, login: &mut LoginSession, session: &mud_core::SessionId, line: &str) -> LoginOutcome {
    let line = line.trim();
    match login.state.clone() {
        LoginState::Name => {
            let name = normalize_name(line);
            if !is_valid_name(&name) {
                return LoginOutcome::Reprompt("Names are 3-16 letters only. Try again.".into());
            }
            let registering = !ctx.player_exists(&name);
            login.name = Some(name);
            login.state = LoginState::Password { registering };
            LoginOutcome::Reprompt(login.prompt().into())
        }
        LoginState::Password { registering } => {
            let name = login.name.clone().unwrap_or_default();
            if registering {
                if mud_storage::validate_password_strength(line).is_err() {
                    return LoginOutcome::Reprompt("That password is too short. Try again.".into());
                }
                login.password = Some(line.to_string());
                login.state = LoginState::ConfirmPassword;
                LoginOutcome::Reprompt(login.prompt().into())
            } else {
                match ctx.load_player_data(&name) {
                    Ok(record) if record.password.verify(line) => {
                        complete_login(ctx, session, record, true)
                    }
                    _ => {
                        login.state = LoginState::Name;
                        login.name = None;
                        LoginOutcome::Reprompt("Wrong password.\nWhat name do you want to use?".into())
                    }
                }
            }
        }
        LoginState::ConfirmPassword => {
            if login.password.as_deref() != Some(line) {
                login.password = None;
                login.state = LoginState::Password { registering: true };
                return LoginOutcome::Reprompt(format!("Passwords didn't match. {}", login.prompt()));
            }
            login.state = LoginState::Email;
            LoginOutcome::Reprompt(login.prompt().into())
        }
        LoginState::Email => {
            login.email = (!line.is_empty()).then(|| line.to_string());
            login.state = LoginState::Gender;
            LoginOutcome::Reprompt(login.prompt().into())
        }
        LoginState::Gender => {
            login.gender = (!line.is_empty()).then(|| line.to_string());
            let name = login.name.clone().unwrap_or_default();
            let password = login.password.clone().unwrap_or_default();
            complete_registration(ctx, session, name, password, login.email.clone(), login.gender.clone())
        }
    }
}

/// Handle a one-shot structured `AUTH_REQ` (§4.4 "the structured flow").
pub fn handle_auth_request(ctx: &mut DriverContext, session: &mud_core::SessionId, request: AuthRequest) -> LoginOutcome {
    let name = normalize_name(&request.name);
    if !is_valid_name(&name) {
        return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::ValidationError, "invalid name"));
    }
    match request.kind {
        AuthRequestType::Login => {
            let Ok(record) = ctx.load_player_data(&name) else {
                return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::UserNotFound, "no such player"));
            };
            if !record.password.verify(&request.password) {
                return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::InvalidCredentials, "wrong password"));
            }
            match complete_login(ctx, session, record, true) {
                LoginOutcome::Authenticated { .. } => LoginOutcome::Auth(AuthResponse::ok()),
                other => other,
            }
        }
        AuthRequestType::Register => {
            if ctx.player_exists(&name) {
                return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::NameTaken, "name already taken"));
            }
            if request.confirm_password.as_deref() != Some(request.password.as_str()) {
                return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::ValidationError, "passwords do not match"));
            }
            if mud_storage::validate_password_strength(&request.password).is_err() {
                return LoginOutcome::Auth(AuthResponse::failure(AuthErrorCode::ValidationError, "password too short"));
            }
            match complete_registration(ctx, session, name, request.password, request.email, request.gender) {
                LoginOutcome::Authenticated { .. } => LoginOutcome::Auth(AuthResponse::ok()),
                other => other,
            }
        }
    }
}

/// Build and persist a brand-new [`PlayerRecord`], then finish the same way
/// an existing login does (§4.4 "fresh registration").
fn complete_registration(
    ctx: &mut DriverContext,
    session: &mud_core::SessionId,
    name: String,
    password: String,
    email: Option<String>,
    gender: Option<String>,
) -> LoginOutcome {
    let hashed = match StoredPassword::hash(&password) {
        Ok(hashed) => hashed,
        Err(err) => {
            ctx.emit_event(mud_core::Event::LoginFailed { name: name.clone(), reason: err.to_string() });
            return LoginOutcome::Reprompt("Something went wrong setting your password. Try again.".into());
        }
    };
    let is_first_player = matches!(ctx.player_count(), Ok(0));
    let mut record = PlayerRecord::new_registration(name.clone(), ctx.start_room.as_str().to_string(), hashed, chrono::Utc::now());
    if let Some(email) = email {
        record.state.properties.insert("email".into(), serde_json::Value::String(email));
    }
    if let Some(gender) = gender {
        record.state.properties.insert("gender".into(), serde_json::Value::String(normalize_gender(&gender)));
    }
    record.is_administrator = is_first_player;
    if let Err(err) = ctx.save_player(&record) {
        ctx.emit_event(mud_core::Event::LoginFailed { name: name.clone(), reason: err.to_string() });
        return LoginOutcome::Reprompt("Could not save your new character. Try again later.".into());
    }
    if is_first_player {
        ctx.set_permission_level(None, &name, Level::Administrator);
    }
    complete_login(ctx, session, record, false)
}

/// Map the gender prompt's `1`/`2` selection to its named value (§8 scenario
/// 1: input `1` must persist as `gender = male`, `2` as `female`). Anything
/// else is stored verbatim, so a structured `AUTH_REQ` caller may still send
/// a name directly.
fn normalize_gender(input: &str) -> String {
    match input {
        "1" => "male".to_string(),
        "2" => "female".to_string(),
        other => other.to_string(),
    }
}

/// Bind `session` to the player described by `record`, choosing between
/// session takeover, reconnect, and a fresh connection (§4.4).
fn complete_login(ctx: &mut DriverContext, session: &mud_core::SessionId, record: PlayerRecord, existing: bool) -> LoginOutcome {
    let name = record.name.clone();

    if let Some(entity) = ctx.find_connected_player(&name) {
        // Session takeover: the previous session is displaced, not destroyed.
        let stale_session = ctx.player_sessions.get(&entity).cloned();
        ctx.transfer_connection(session, entity.clone());
        if let Some(stale) = &stale_session {
            ctx.send_frame_to_session(
                stale,
                Frame::text("Someone has logged in as you from another location. You have been disconnected."),
            );
        }
        ctx.emit_event(mud_core::Event::SessionTakeover { session: session.clone(), player: entity.clone() });
        return finish_authenticated(ctx, session, entity, name.clone(), format!("Reconnected as {name}."), stale_session, false);
    }

    if let Some(entity) = ctx.find_active_player(&name) {
        // Disconnected but still reserved: cancel the pending disconnect
        // timeout and bring them back from the disconnection-holding area to
        // wherever they were standing when they dropped (§4.3, §4.9 "Active-
        // player table"). Both are bookkeeping on the live entity, not the
        // on-disk record, since it was never actually destroyed.
        let (disconnect_task, previous_location) = ctx
            .registry
            .find_mut(entity.as_str())
            .map(|live| {
                (
                    live.state.remove(DISCONNECT_TASK_KEY).and_then(|v| v.as_str().map(String::from)),
                    live.state.remove(PREVIOUS_LOCATION_KEY).and_then(|v| v.as_str().map(String::from)),
                )
            })
            .unwrap_or((None, None));
        if let Some(task_id) = disconnect_task {
            ctx.remove_call_out(&task_id);
        }
        ctx.transfer_connection(session, entity.clone());
        ctx.register_active_player(&name, entity.clone());
        let destination = previous_location.map(mud_core::ContentPath::new).unwrap_or_else(|| ctx.start_room.clone());
        if let Some(room_entity) = ctx.registry.find(destination.as_str()) {
            let room_id = room_entity.object_id.clone();
            let _ = ctx.registry.move_entity(&entity, Some(room_id));
        }
        ctx.emit_event(mud_core::Event::SessionReconnected { session: session.clone(), player: entity.clone() });
        return finish_authenticated(ctx, session, entity, name.clone(), format!("Welcome back, {name}."), None, true);
    }

    // Fresh connection: clone a blueprint instance and move it in.
    let Some(entity) = ctx.clone_object("/std/player") else {
        return LoginOutcome::Reprompt("The game world isn't ready yet. Try again shortly.".into());
    };
    if let Some(mutable) = ctx.registry.find_mut(entity.as_str()) {
        mutable.state.insert("name".into(), serde_json::Value::String(name.clone()));
        for (key, value) in record.state.properties.iter() {
            mutable.state.insert(key.clone(), value.clone());
        }
    }
    let destination = mud_core::ContentPath::new(record.location.clone());
    let target = if ctx.registry.find(destination.as_str()).is_some() { destination } else { ctx.start_room.clone() };
    if let Some(room) = ctx.registry.find(target.as_str()) {
        let room_id = room.object_id.clone();
        let _ = ctx.registry.move_entity(&entity, Some(room_id));
    }
    ctx.transfer_connection(session, entity.clone());
    ctx.register_active_player(&name, entity.clone());
    ctx.emit_event(mud_core::Event::PlayerRegistered { player: entity.clone(), name: name.clone() });

    let welcome = if existing { format!("Welcome back, {name}.") } else { format!("Welcome to the game, {name}!") };
    finish_authenticated(ctx, session, entity, name, welcome, None, false)
}

/// Issue the session-resume token over `SESSION` and record the login
/// (§4.4 "opaque, TTL-bounded ... client may present it on reconnect").
/// Shared tail for every successful branch of [`complete_login`].
fn finish_authenticated(
    ctx: &mut DriverContext,
    session: &mud_core::SessionId,
    entity: ObjectId,
    name: String,
    welcome: String,
    stale_session: Option<mud_core::SessionId>,
    reconnected: bool,
) -> LoginOutcome {
    let (token, expires_at) = ctx.issue_session_token(entity.clone(), env::session_token_ttl().as_millis() as u64);
    let message = SessionMessage::token(token.as_str(), expires_at);
    if let Ok(payload) = serde_json::to_value(&message) {
        ctx.send_frame_to_session(session, Frame::control(Subchannel::Session, payload));
    }
    ctx.emit_event(mud_core::Event::LoginSucceeded { player: entity.clone(), name });
    LoginOutcome::Authenticated { entity, welcome, stale_session, reconnected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::state::DriverState;
    use mud_content::{CompileDiagnostic, CompiledUnit, ContentCompiler};
    use mud_core::{CapabilitySet, ContentPath, Entity, SessionId};
    use std::sync::Arc;

    struct NullCompiler;
    impl ContentCompiler for NullCompiler {
        fn compile(&self, _path: &ContentPath, _source: &str) -> Result<CompiledUnit, CompileDiagnostic> {
            Err(CompileDiagnostic::new(1, 1, "unused in tests"))
        }
    }

    struct PlainClass;
    impl mud_core::ContentClass for PlainClass {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new()
        }
    }

    /// Each test gets its own data root so `save_player` writes never leak
    /// across test runs (unlike `dispatch.rs`'s tests, these actually touch
    /// disk via the login flow).
    fn new_state() -> (DriverState, tempfile::TempDir) {
        let data_root = tempfile::tempdir().unwrap();
        let config = crate::env::Config {
            mudlib_path: data_root.path().into(),
            master_object: "/master".into(),
            heartbeat_interval_ms: crate::env::DEFAULT_HEARTBEAT_INTERVAL_MS,
            hot_reload: false,
            isolate_memory_mb: crate::env::DEFAULT_ISOLATE_MEMORY_MB,
            log_level: "info".into(),
            log_pretty: false,
            tcp_port: crate::env::DEFAULT_TCP_PORT,
            start_room: "/domain/start".into(),
        };
        let mut state = DriverState::new(&config, data_root.path().to_path_buf(), Arc::new(NullCompiler));
        let start_path = state.start_room.clone();
        state.registry.register_blueprint(start_path.clone(), Arc::new(PlainClass), Entity::new_blueprint(start_path)).unwrap();
        let player_path = ContentPath::new("/std/player");
        state
            .registry
            .register_blueprint(player_path.clone(), Arc::new(PlainClass), Entity::new_blueprint(player_path))
            .unwrap();
        (state, data_root)
    }

    fn new_session(state: &mut DriverState) -> SessionId {
        let id = SessionId::new(uuid::Uuid::new_v4().to_string());
        state.sessions.insert(id.clone(), Session::new(id.clone()));
        id
    }

    #[test]
    fn fresh_registration_walks_through_every_state() {
        let (mut state, _data_root) = new_state();
        let session = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        let mut login = LoginSession::new();

        assert!(matches!(handle_line(&mut ctx, &mut login, &session, "Bob"), LoginOutcome::Reprompt(_)));
        assert!(matches!(handle_line(&mut ctx, &mut login, &session, "hunter22"), LoginOutcome::Reprompt(_)));
        assert!(matches!(handle_line(&mut ctx, &mut login, &session, "hunter22"), LoginOutcome::Reprompt(_)));
        assert!(matches!(handle_line(&mut ctx, &mut login, &session, ""), LoginOutcome::Reprompt(_)));
        let outcome = handle_line(&mut ctx, &mut login, &session, "");
        match outcome {
            LoginOutcome::Authenticated { reconnected, stale_session, .. } => {
                assert!(!reconnected);
                assert!(stale_session.is_none());
            }
            _ => panic!("expected Authenticated"),
        }
        assert!(ctx.player_exists("Bob"));
    }

    #[test]
    fn first_registered_player_becomes_administrator() {
        let (mut state, _data_root) = new_state();
        let session = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        complete_registration(&mut ctx, &session, "Alice".into(), "hunter22".into(), None, None);
        assert_eq!(ctx.level_of(Some("Alice")), Level::Administrator);
    }

    #[test]
    fn gender_selection_one_persists_as_male() {
        let (mut state, _data_root) = new_state();
        let session = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        complete_registration(&mut ctx, &session, "Erin".into(), "hunter22".into(), None, Some("1".into()));
        let record = ctx.load_player_data("Erin").unwrap();
        assert_eq!(record.state.properties.get("gender"), Some(&serde_json::Value::String("male".into())));
    }

    #[test]
    fn short_password_reprompts_without_advancing_state() {
        let (mut state, _data_root) = new_state();
        let session = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        let mut login = LoginSession::new();
        handle_line(&mut ctx, &mut login, &session, "Carl");
        let outcome = handle_line(&mut ctx, &mut login, &session, "ab");
        assert!(matches!(outcome, LoginOutcome::Reprompt(_)));
        assert_eq!(login.state, LoginState::Password { registering: true });
    }

    #[test]
    fn mismatched_confirmation_sends_player_back_to_choose_a_password() {
        let (mut state, _data_root) = new_state();
        let session = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        let mut login = LoginSession::new();
        handle_line(&mut ctx, &mut login, &session, "Dana");
        handle_line(&mut ctx, &mut login, &session, "hunter22");
        handle_line(&mut ctx, &mut login, &session, "different");
        assert_eq!(login.state, LoginState::Password { registering: true });
    }

    #[test]
    fn structured_register_then_login_round_trips() {
        let (mut state, _data_root) = new_state();
        let session_a = new_session(&mut state);
        let session_b = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);

        let register = AuthRequest {
            kind: AuthRequestType::Register,
            name: "eve".into(),
            password: "hunter22".into(),
            confirm_password: Some("hunter22".into()),
            email: Some("eve@example.com".into()),
            gender: None,
        };
        let outcome = handle_auth_request(&mut ctx, &session_a, register);
        assert!(matches!(outcome, LoginOutcome::Auth(AuthResponse { success: true, .. })));

        ctx.unregister_active_player("Eve");

        let login = AuthRequest {
            kind: AuthRequestType::Login,
            name: "eve".into(),
            password: "hunter22".into(),
            confirm_password: None,
            email: None,
            gender: None,
        };
        let outcome = handle_auth_request(&mut ctx, &session_b, login);
        assert!(matches!(outcome, LoginOutcome::Auth(AuthResponse { success: true, .. })));
    }

    #[test]
    fn wrong_password_on_an_existing_name_returns_to_the_name_prompt() {
        let (mut state, _data_root) = new_state();
        let session_a = new_session(&mut state);
        let session_b = new_session(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        let mut login = LoginSession::new();
        handle_line(&mut ctx, &mut login, &session_a, "Frank");
        handle_line(&mut ctx, &mut login, &session_a, "hunter22");
        handle_line(&mut ctx, &mut login, &session_a, "hunter22");
        handle_line(&mut ctx, &mut login, &session_a, "");
        handle_line(&mut ctx, &mut login, &session_a, "");

        let mut login2 = LoginSession::new();
        handle_line(&mut ctx, &mut login2, &session_b, "Frank");
        let outcome = handle_line(&mut ctx, &mut login2, &session_b, "wrongpass");
        assert!(matches!(outcome, LoginOutcome::Reprompt(_)));
        assert_eq!(login2.state, LoginState::Name);
    }
}
