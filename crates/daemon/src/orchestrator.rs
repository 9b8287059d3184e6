// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Driver Orchestrator (§4.9, C9): owns the single [`DriverState`], runs
//! the `stopped -> starting -> running -> stopping -> stopped` lifecycle, and
//! turns `listener.rs` connection events into login and command dispatch.
//!
//! Exactly one task ever touches [`DriverState`] (§5): this one. The
//! listener's accept loop and each connection's I/O pump run on their own
//! tasks and only ever talk to this loop over channels.

use crate::efuns::sub_efuns;
use crate::env::Config;
use crate::error::DaemonError;
use crate::listener::{self, ConnectionEvent};
use crate::login::{self, LoginOutcome, LoginSession};
use crate::session::{Session, SessionOwner, SAVE_DEBOUNCE_CALLBACK};
use crate::state::DriverState;
use indexmap::IndexMap;
use mud_content::ContentCompiler;
use mud_core::{ContentPath, Event, ObjectId, ScheduledTask, SessionId};
use mud_wire::{AuthRequest, CompleteRequest, CompleteResponse, Frame, SessionMessage, Subchannel, TimeAck, TimePong};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Driver lifecycle phase (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Callback name the scheduler fires on the `TIME` keepalive's own task
/// (§4.3 "periodically"), distinct from any content-registered callback.
const TIME_KEEPALIVE_CALLBACK: &str = "__time_keepalive";
/// Callback name for a disconnected player's reservation timeout (§4.3, §4.9).
const DISCONNECT_TIMEOUT_CALLBACK: &str = "__disconnect_timeout";

/// Owns the single [`DriverState`] plus the per-session scratch the login
/// flow and outbound framing need before and after a session is bound to a
/// player.
pub struct Orchestrator {
    state: DriverState,
    mudlib_path: PathBuf,
    logins: IndexMap<SessionId, LoginSession>,
    outbound: IndexMap<SessionId, mpsc::UnboundedSender<Frame>>,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(config: &Config, compiler: Arc<dyn ContentCompiler>) -> Self {
        let data_root = config.mudlib_path.join("data");
        Self {
            state: DriverState::new(config, data_root, compiler),
            mudlib_path: config.mudlib_path.clone(),
            logins: IndexMap::new(),
            outbound: IndexMap::new(),
            phase: Phase::Stopped,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the full lifecycle on `addr` until interrupted by ctrl-c (§4.9).
    pub async fn run(mut self, addr: SocketAddr) -> Result<(), DaemonError> {
        self.start()?;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let listener_events = events_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = listener::run(addr, listener_events).await {
                warn!(%err, "listener stopped");
            }
        });

        let tick_period = Duration::from_millis(self.state.scheduler.tick_period_ms().max(1));
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        self.phase = Phase::Running;
        info!("driver running");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = ticker.tick() => self.on_tick(),
                event = events_rx.recv() => match event {
                    Some(event) => self.on_connection_event(event),
                    None => break,
                },
            }
            self.flush_outbound();
        }

        self.stop();
        Ok(())
    }

    // --- Lifecycle (§4.9) ---

    /// `starting`: restore permissions, load the master and login-daemon
    /// blueprints, and notify content that the driver is up.
    fn start(&mut self) -> Result<(), DaemonError> {
        self.phase = Phase::Starting;

        {
            let mut stack = Vec::new();
            let mut pending = Vec::new();
            let mut ctx = self.state.context(&mut stack, &mut pending);
            ctx.load_permissions()?;
        }

        self.state.scheduler.call_out_every(None, TIME_KEEPALIVE_CALLBACK, crate::session::TIME_KEEPALIVE_INTERVAL.as_millis() as u64);

        let master_path = self.state.master_path.clone();
        let login_path = self.state.login_daemon_path.clone();
        self.load_blueprint(&master_path).map_err(|err| DaemonError::MasterLoadFailed(err.to_string()))?;
        // The login daemon is an optional customization point; its absence
        // is not fatal since login.rs drives the flow natively either way.
        let _ = self.load_blueprint(&login_path);

        self.invoke_driver_hook(&master_path, "on_driver_start");
        info!("driver started");
        Ok(())
    }

    /// `stopping` -> `stopped`: notify content, then tear down.
    fn stop(&mut self) {
        self.phase = Phase::Stopping;
        let master_path = self.state.master_path.clone();
        self.invoke_driver_hook(&master_path, "on_shutdown");
        self.phase = Phase::Stopped;
        info!("driver stopped");
    }

    fn load_blueprint(&mut self, path: &ContentPath) -> Result<(), DaemonError> {
        let source = std::fs::read_to_string(source_path(&self.mudlib_path, path))?;
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let mut sub = sub_efuns!(ctx, None, None);
        ctx.content.reload(path, &source, &mut *ctx.registry, &mut sub)?;
        Ok(())
    }

    /// Invoke a driver lifecycle hook on `path`'s own blueprint entity via
    /// the ordinary `handle_verb` convention — `ContentClass` has no
    /// dedicated lifecycle hooks, so `on_driver_start`/`on_shutdown` are
    /// plain verbs the master object may choose to handle.
    fn invoke_driver_hook(&mut self, path: &ContentPath, hook: &str) {
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let Some(class) = ctx.registry.class_of(path) else { return };
        let mut sub = sub_efuns!(ctx, None, None);
        if let Some(entity) = ctx.registry.find_mut(path.as_str()) {
            class.handle_verb(hook, "", &mut entity.state, &mut sub);
        }
    }

    // --- Connection events (§4.9 "running") ---

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Accepted { session_id, remote_host, outbound } => {
                self.on_accepted(session_id, remote_host, outbound)
            }
            ConnectionEvent::Frame { session_id, frame } => self.on_frame(&session_id, frame),
            ConnectionEvent::Closed { session_id } => self.on_closed(&session_id),
        }
    }

    fn on_accepted(&mut self, session_id: SessionId, remote_host: Option<String>, outbound: mpsc::UnboundedSender<Frame>) {
        self.outbound.insert(session_id.clone(), outbound);
        let mut session = Session::new(session_id.clone());
        session.remote_host = remote_host.clone();
        self.state.sessions.insert(session_id.clone(), session);

        let login = LoginSession::new();
        let prompt = login.prompt().to_string();
        self.logins.insert(session_id.clone(), login);

        self.state
            .events
            .push(Event::SessionOpened { session: session_id.clone(), remote_addr: remote_host.unwrap_or_default() });
        self.send_line(&session_id, &prompt);
    }

    fn on_frame(&mut self, session_id: &SessionId, frame: Frame) {
        match frame {
            Frame::Text(line) => self.on_text_line(session_id, &line),
            Frame::Control { tag: Subchannel::AuthReq, payload } => self.on_auth_request(session_id, payload),
            Frame::Control { tag: Subchannel::Session, payload } => self.on_session_resume(session_id, payload),
            Frame::Control { tag: Subchannel::TimeAck, payload } => self.on_time_ack(session_id, payload),
            Frame::Control { tag: Subchannel::Complete, payload } => self.on_complete_request(session_id, payload),
            // Every other subchannel (MAP, IDE, STATS, GUI, ...) is opaque to
            // the driver (§6) and has no client-to-server meaning here.
            Frame::Control { .. } => {}
        }
    }

    fn on_text_line(&mut self, session_id: &SessionId, line: &str) {
        let Some(owner) = self.state.sessions.get(session_id).map(|s| s.owner.clone()) else { return };
        match owner {
            SessionOwner::Player(entity) => self.dispatch_command(&entity, line),
            SessionOwner::LoggingIn => self.on_login_line(session_id, line),
        }
    }

    fn dispatch_command(&mut self, entity: &ObjectId, line: &str) {
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let name = ctx
            .registry
            .find(entity.as_str())
            .and_then(|e| e.state.get("name"))
            .and_then(|v| v.as_str().map(str::to_string));
        let level = ctx.level_of(name.as_deref());
        ctx.execute_command(entity, line, level);
    }

    fn on_login_line(&mut self, session_id: &SessionId, line: &str) {
        let Some(mut login) = self.logins.get(session_id).cloned() else { return };
        let outcome = {
            let mut stack = Vec::new();
            let mut pending = Vec::new();
            let mut ctx = self.state.context(&mut stack, &mut pending);
            login::handle_line(&mut ctx, &mut login, session_id, line)
        };
        self.logins.insert(session_id.clone(), login);
        self.apply_login_outcome(session_id, outcome);
    }

    fn on_auth_request(&mut self, session_id: &SessionId, payload: serde_json::Value) {
        let request: AuthRequest = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(_) => {
                let response =
                    mud_wire::AuthResponse::failure(mud_wire::AuthErrorCode::ValidationError, "malformed auth request");
                self.send_auth_response(session_id, response);
                return;
            }
        };
        let outcome = {
            let mut stack = Vec::new();
            let mut pending = Vec::new();
            let mut ctx = self.state.context(&mut stack, &mut pending);
            login::handle_auth_request(&mut ctx, session_id, request)
        };
        self.apply_login_outcome(session_id, outcome);
    }

    /// A `SESSION` frame from a still-authenticating session presents a
    /// resume token (§4.4). There is no typed client-to-server struct for
    /// this (`SessionMessage` is the server's own s->c shape), so the token
    /// is read directly out of the raw payload.
    fn on_session_resume(&mut self, session_id: &SessionId, payload: serde_json::Value) {
        let Some(token) = payload.get("token").and_then(|v| v.as_str()).map(str::to_string) else { return };
        let resolved = {
            let mut stack = Vec::new();
            let mut pending = Vec::new();
            let mut ctx = self.state.context(&mut stack, &mut pending);
            match ctx.resolve_session_token(&token) {
                Some(entity) => {
                    ctx.transfer_connection(session_id, entity.clone());
                    Some(entity)
                }
                None => None,
            }
        };
        match resolved {
            Some(_) => {
                self.logins.shift_remove(session_id);
                self.send_line(session_id, "Session resumed.");
            }
            None => {
                let payload = serde_json::to_value(SessionMessage::invalid()).unwrap_or(serde_json::Value::Null);
                self.send_control(session_id, Subchannel::Session, payload);
            }
        }
    }

    fn on_time_ack(&mut self, session_id: &SessionId, payload: serde_json::Value) {
        let Ok(ack) = serde_json::from_value::<TimeAck>(payload) else { return };
        let pong = TimePong { client_time_ms: ack.client_time_ms };
        let payload = serde_json::to_value(pong).unwrap_or(serde_json::Value::Null);
        self.send_control(session_id, Subchannel::TimePong, payload);
    }

    /// Tab-completion (§4.3, §6): resolve the requesting player's name for
    /// the permission audit, then list mudlib entries matching the typed
    /// prefix, directories suffixed with `/`.
    fn on_complete_request(&mut self, session_id: &SessionId, payload: serde_json::Value) {
        let Ok(request) = serde_json::from_value::<CompleteRequest>(payload) else { return };
        let subject = self
            .state
            .sessions
            .get(session_id)
            .and_then(|session| session.player())
            .and_then(|entity| self.state.registry.find(entity.as_str()))
            .and_then(|found| found.state.get("name"))
            .and_then(|value| value.as_str().map(str::to_string));

        {
            let mut stack = Vec::new();
            let mut pending = Vec::new();
            let mut ctx = self.state.context(&mut stack, &mut pending);
            ctx.permissions.check_read(subject.as_deref(), &request.path);
        }

        let candidates = crate::completion::candidates(&self.mudlib_path, &request.path);
        let response = CompleteResponse { candidates };
        let payload = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);
        self.send_control(session_id, Subchannel::Complete, payload);
    }

    fn apply_login_outcome(&mut self, session_id: &SessionId, outcome: LoginOutcome) {
        match outcome {
            LoginOutcome::Reprompt(line) => self.send_line(session_id, &line),
            LoginOutcome::Auth(response) => self.send_auth_response(session_id, response),
            LoginOutcome::Authenticated { entity: _, welcome, stale_session, reconnected: _ } => {
                self.logins.shift_remove(session_id);
                self.send_line(session_id, &welcome);
                if let Some(stale) = stale_session {
                    self.close_session(&stale);
                }
            }
        }
    }

    fn send_auth_response(&mut self, session_id: &SessionId, response: mud_wire::AuthResponse) {
        let payload = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);
        self.send_control(session_id, Subchannel::Auth, payload);
    }

    fn on_closed(&mut self, session_id: &SessionId) {
        if let Some(entity) = self.state.sessions.get(session_id).and_then(|s| s.player().cloned()) {
            self.reserve_disconnected_player(&entity);
        }
        self.outbound.remove(session_id);
        self.state.sessions.shift_remove(session_id);
        self.logins.shift_remove(session_id);
        self.state.unbind_session(session_id);
        self.state.events.push(Event::SessionClosed { session: session_id.clone() });
    }

    /// Move a disconnected player out of the world and schedule the
    /// reservation timeout that will destroy it if it never reconnects
    /// (§4.3, §4.4, §4.9).
    fn reserve_disconnected_player(&mut self, entity: &ObjectId) {
        let timeout_ms = crate::env::disconnect_timeout().as_millis() as u64;
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let previous_location = ctx.registry.find(entity.as_str()).and_then(|e| e.environment.clone());
        let _ = ctx.registry.move_entity(entity, None);
        let task_id = ctx.scheduler.call_out(Some(entity.clone()), DISCONNECT_TIMEOUT_CALLBACK, timeout_ms);
        if let Some(live) = ctx.registry.find_mut(entity.as_str()) {
            live.state.insert(login::DISCONNECT_TASK_KEY.to_string(), serde_json::Value::String(task_id.as_str().to_string()));
            if let Some(room) = previous_location {
                live.state.insert(login::PREVIOUS_LOCATION_KEY.to_string(), serde_json::Value::String(room.as_str().to_string()));
            }
        }
    }

    // --- Scheduler tick (§4.2, §4.9) ---

    fn on_tick(&mut self) {
        let now_ms = mud_core::Clock::epoch_ms(&mud_core::SystemClock);
        let fired = self.state.scheduler.drain_due(now_ms);
        for task in &fired {
            self.run_scheduled_task(task);
            self.state.events.push(Event::TaskFired { id: task.id.clone(), target: task.target_entity.clone() });
        }

        let heartbeat = self.state.scheduler.heartbeat_snapshot();
        let registered = heartbeat.len();
        for entity in &heartbeat {
            self.run_heartbeat(entity);
        }
        if registered > 0 {
            self.state.events.push(Event::HeartbeatTick { registered });
        }
    }

    fn run_scheduled_task(&mut self, task: &ScheduledTask) {
        match task.callback.as_str() {
            TIME_KEEPALIVE_CALLBACK => self.broadcast_time(),
            DISCONNECT_TIMEOUT_CALLBACK => {
                if let Some(entity) = &task.target_entity {
                    self.expire_disconnected_player(entity);
                }
            }
            SAVE_DEBOUNCE_CALLBACK => {
                if let Some(entity) = &task.target_entity {
                    self.run_debounced_save(entity);
                }
            }
            callback => {
                if let Some(entity) = &task.target_entity {
                    self.invoke_on_call_out(entity, callback);
                }
            }
        }
    }

    fn invoke_on_call_out(&mut self, entity: &ObjectId, callback: &str) {
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let Some(blueprint_path) = ctx.registry.find(entity.as_str()).map(|e| e.blueprint_path.clone()) else { return };
        let Some(class) = ctx.registry.class_of(&blueprint_path) else { return };
        let mut sub = sub_efuns!(ctx, None, Some(entity.clone()));
        if let Some(live) = ctx.registry.find_mut(entity.as_str()) {
            class.on_call_out(callback, &serde_json::Value::Null, &mut live.state, &mut sub);
        }
    }

    fn run_heartbeat(&mut self, entity: &ObjectId) {
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        let Some(blueprint_path) = ctx.registry.find(entity.as_str()).map(|e| e.blueprint_path.clone()) else { return };
        let Some(class) = ctx.registry.class_of(&blueprint_path) else { return };
        let mut sub = sub_efuns!(ctx, None, Some(entity.clone()));
        if let Some(live) = ctx.registry.find_mut(entity.as_str()) {
            class.on_heartbeat(&mut live.state, &mut sub);
        }
    }

    /// The debounce window armed by [`crate::efuns::DriverContext::
    /// trigger_save_debounce`] elapsed; write the entity's current state
    /// (§4.5 step 6 "Save trigger").
    fn run_debounced_save(&mut self, entity: &ObjectId) {
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = self.state.context(&mut stack, &mut pending);
        ctx.pending_saves.shift_remove(entity);
        if let Err(err) = ctx.save_player_snapshot(entity) {
            warn!(%entity, %err, "debounced player save failed");
        }
    }

    /// A disconnected player's reservation window elapsed with no reconnect
    /// (§4.3, §4.9): unregister and destroy it.
    fn expire_disconnected_player(&mut self, entity: &ObjectId) {
        let name = self
            .state
            .registry
            .find(entity.as_str())
            .and_then(|e| e.state.get("name"))
            .and_then(|v| v.as_str().map(str::to_string));
        if let Some(name) = &name {
            self.state.unregister_active_player(name);
        }
        self.state.scheduler.cancel_all_for(entity);
        self.state.pending_saves.shift_remove(entity);
        if let Ok(removed) = self.state.registry.destroy(entity) {
            for id in removed {
                self.state.events.push(Event::EntityDestroyed { object_id: id });
            }
        }
    }

    fn broadcast_time(&mut self) {
        let now_ms = mud_core::Clock::epoch_ms(&mud_core::SystemClock);
        let payload = serde_json::json!({ "epoch_ms": now_ms });
        let ids: Vec<SessionId> = self.state.sessions.keys().cloned().collect();
        for id in ids {
            self.send_control(&id, Subchannel::Time, payload.clone());
        }
    }

    // --- Outbound framing ---

    fn send_line(&mut self, session_id: &SessionId, line: &str) {
        if let Some(session) = self.state.sessions.get_mut(session_id) {
            session.outbound.push(Frame::text(line));
        }
    }

    fn send_control(&mut self, session_id: &SessionId, tag: Subchannel, payload: serde_json::Value) {
        if let Some(session) = self.state.sessions.get_mut(session_id) {
            session.outbound.push(Frame::control(tag, payload));
        }
    }

    /// Drop a session's outbound sender, which closes its connection task's
    /// `outbound_rx.recv()` with `None` and ends the connection (§4.4
    /// "session takeover ... the previous session is displaced").
    fn close_session(&mut self, session_id: &SessionId) {
        self.outbound.remove(session_id);
    }

    /// Drain every session's buffered frames out to its socket after each
    /// turn (§4.3).
    fn flush_outbound(&mut self) {
        for (session_id, session) in self.state.sessions.iter_mut() {
            if session.outbound.is_empty() {
                continue;
            }
            let frames = session.outbound.drain();
            if let Some(sender) = self.outbound.get(session_id) {
                for frame in frames {
                    let _ = sender.send(frame);
                }
            }
        }
    }
}

/// Resolve `content_path`'s source file under `mudlib_path`, the inverse of
/// `mud_content::watcher`'s filesystem-to-content-path mapping. Paths with no
/// extension of their own are assumed to be `.mud` source files.
fn source_path(mudlib_path: &Path, content_path: &ContentPath) -> PathBuf {
    let relative = content_path.as_str().trim_start_matches('/');
    let candidate = mudlib_path.join(relative);
    if candidate.extension().is_some() {
        candidate
    } else {
        candidate.with_extension("mud")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn source_path_joins_mudlib_root_and_adds_extension() {
        let root = Path::new("/srv/mudlib");
        let path = source_path(root, &ContentPath::new("/domain/start"));
        assert_eq!(path, Path::new("/srv/mudlib/domain/start.mud"));
    }

    #[test]
    fn source_path_preserves_an_existing_extension() {
        let root = Path::new("/srv/mudlib");
        let path = source_path(root, &ContentPath::new("/domain/room.mud"));
        assert_eq!(path, Path::new("/srv/mudlib/domain/room.mud"));
    }
}
