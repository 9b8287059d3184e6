// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Command Dispatcher (§4.5, C5): one line of player input in, a
//! resolved and executed verb out.
//!
//! [`execute_line`] is the single entry point, called by
//! [`crate::efuns::DriverContext::execute_command`]. Verb resolution needs
//! a `&mut ObjectRegistry` (for `find_mut`, to hand content its own state)
//! alongside a [`crate::efuns::SubEfuns`] built from the rest of
//! `DriverContext` — the same disjoint-field-borrow shape documented on the
//! `sub_efuns!` macro in `efuns.rs`.

use crate::efuns::{sub_efuns, ContextGuard, DriverContext};
use mud_core::{Event, Level, ObjectId, VerbOutcome};
use serde_json::Value;

/// Escape sequence that cancels whatever multi-step prompt is active for a
/// session (§4.5 "prompts may be cancelled by a designated escape
/// sequence").
pub const PROMPT_ESCAPE: &str = "~.";

/// Reserved [`mud_core::Entity::state`] key holding a player's alias map, a
/// plain `{alias: expansion}` JSON object (§4.5 "alias map" — `Entity.state`
/// has no dedicated field for it, so the dispatcher keeps it alongside the
/// rest of a player's persisted state under this key).
const ALIAS_STATE_KEY: &str = "__aliases";

/// Reserved state key naming the verb a multi-step prompt (e.g. an editor
/// session) resumes with; raw input bypasses verb resolution entirely while
/// it is set (§4.5).
const PROMPT_STATE_KEY: &str = "__prompt";

const RESERVED_ALIAS_VERBS: &[&str] = &["alias", "unalias", "aliases"];

/// Dispatch one line of input from `entity`, a connected player at
/// `level` (§4.5).
pub fn execute_line(ctx: &mut DriverContext, entity: &ObjectId, line: &str, level: Level) {
    if line.trim().is_empty() {
        return;
    }

    if let Some(prompt_verb) = active_prompt(ctx, entity) {
        if line.trim() == PROMPT_ESCAPE {
            clear_prompt(ctx, entity);
            ctx.send_message(entity, "Cancelled.");
            return;
        }
        let _ = run_on_entity(ctx, entity, entity, &prompt_verb, line);
        return;
    }

    let expanded = expand_alias(ctx, entity, line);
    let (verb, args) = split_verb(&expanded);
    if verb.is_empty() {
        return;
    }

    match resolve_and_execute(ctx, entity, &verb, args, level) {
        Ok(true) => {
            ctx.emit_event(Event::CommandDispatched { session: session_for(ctx, entity), verb: verb.clone() });
        }
        Ok(false) => {
            ctx.send_message(entity, &format!("What do you want to {verb}?"));
        }
        Err(message) => {
            tracing::error!(%entity, verb = %verb, error = %message, "command dispatch failed");
            ctx.send_message(entity, "Something went wrong.");
            ctx.emit_event(Event::CommandFailed { session: session_for(ctx, entity), verb, error: message });
        }
    }
}

fn session_for(ctx: &DriverContext, entity: &ObjectId) -> mud_core::SessionId {
    ctx.player_sessions
        .get(entity)
        .cloned()
        .unwrap_or_else(|| mud_core::SessionId::new(entity.as_str()))
}

fn split_verb(line: &str) -> (String, &str) {
    let trimmed = line.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(index) => (trimmed[..index].to_lowercase(), trimmed[index..].trim_start()),
        None => (trimmed.to_lowercase(), ""),
    }
}

fn active_prompt(ctx: &DriverContext, entity: &ObjectId) -> Option<String> {
    ctx.registry.find(entity.as_str())?.state.get(PROMPT_STATE_KEY)?.as_str().map(str::to_string)
}

fn clear_prompt(ctx: &mut DriverContext, entity: &ObjectId) {
    if let Some(found) = ctx.registry.find_mut(entity.as_str()) {
        found.state.remove(PROMPT_STATE_KEY);
    }
}

/// Alias expansion (§4.5 step 1): the first word is looked up in `entity`'s
/// alias map; `alias`/`unalias`/`aliases` are never substituted, and a
/// substitution is never itself re-expanded.
fn expand_alias(ctx: &DriverContext, entity: &ObjectId, line: &str) -> String {
    let trimmed = line.trim_start();
    let (word, rest) = match trimmed.find(char::is_whitespace) {
        Some(index) => (&trimmed[..index], &trimmed[index..]),
        None => (trimmed, ""),
    };
    let lower = word.to_lowercase();
    if RESERVED_ALIAS_VERBS.contains(&lower.as_str()) {
        return trimmed.to_string();
    }
    let Some(found) = ctx.registry.find(entity.as_str()) else { return trimmed.to_string() };
    let Some(aliases) = found.state.get(ALIAS_STATE_KEY).and_then(Value::as_object) else {
        return trimmed.to_string();
    };
    match aliases.get(&lower).and_then(Value::as_str) {
        Some(expansion) => format!("{expansion}{rest}"),
        None => trimmed.to_string(),
    }
}

/// Record (or erase) one entry of `entity`'s alias map, for the built-in
/// `alias`/`unalias` commands (§4.5).
pub fn set_alias(ctx: &mut DriverContext, entity: &ObjectId, name: &str, expansion: Option<&str>) {
    let Some(found) = ctx.registry.find_mut(entity.as_str()) else { return };
    let aliases = found.state.entry(ALIAS_STATE_KEY).or_insert_with(|| Value::Object(Default::default()));
    let Value::Object(map) = aliases else { return };
    match expansion {
        Some(expansion) => {
            map.insert(name.to_lowercase(), Value::String(expansion.to_string()));
        }
        None => {
            map.remove(&name.to_lowercase());
        }
    }
}

/// Every alias currently set for `entity`, name to expansion.
pub fn list_aliases(ctx: &DriverContext, entity: &ObjectId) -> Vec<(String, String)> {
    let Some(found) = ctx.registry.find(entity.as_str()) else { return Vec::new() };
    let Some(aliases) = found.state.get(ALIAS_STATE_KEY).and_then(Value::as_object) else { return Vec::new() };
    aliases.iter().filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string()))).collect()
}

/// Verb resolution (§4.5 step 3): built-in scope commands, then handlers
/// installed on nearby objects, then the soul/emote fallback. Returns
/// `Ok(true)` once something handles the verb, `Ok(false)` if nothing does,
/// `Err` if a handler panicked ("command throws", §4.5 edge cases).
fn resolve_and_execute(
    ctx: &mut DriverContext,
    entity: &ObjectId,
    verb: &str,
    args: &str,
    level: Level,
) -> Result<bool, String> {
    for scope in level.scopes() {
        let builtin_path = format!("/cmds/{scope}/{verb}");
        if ctx.registry.find(&builtin_path).is_some() {
            let candidate = ObjectId::new(builtin_path);
            return run_on_entity_and_trigger_save(ctx, entity, &candidate, verb, args);
        }
    }

    for candidate in candidate_objects(ctx, entity) {
        if !handles_verb(ctx, &candidate, verb) {
            continue;
        }
        if run_on_entity_and_trigger_save(ctx, entity, &candidate, verb, args)? {
            return Ok(true);
        }
    }

    if is_known_emote(ctx, verb) {
        let soul = ObjectId::new("/daemons/soul");
        return run_on_entity_and_trigger_save(ctx, entity, &soul, verb, args);
    }

    Ok(false)
}

/// Dispatch `verb` to `candidate`, arming the debounced player save
/// afterwards if `candidate`'s class flags `verb` as mutating (§4.5 step 6
/// "Save trigger").
fn run_on_entity_and_trigger_save(
    ctx: &mut DriverContext,
    entity: &ObjectId,
    candidate: &ObjectId,
    verb: &str,
    args: &str,
) -> Result<bool, String> {
    let handled = run_on_entity(ctx, entity, candidate, verb, args)?;
    if handled && verb_mutates_state(ctx, candidate, verb) {
        ctx.trigger_save_debounce(entity);
    }
    Ok(handled)
}

fn verb_mutates_state(ctx: &DriverContext, candidate: &ObjectId, verb: &str) -> bool {
    let Some(blueprint_path) = ctx.registry.find(candidate.as_str()).map(|found| found.blueprint_path.clone()) else {
        return false;
    };
    let Some(class) = ctx.registry.class_of(&blueprint_path) else { return false };
    class.mutates_state(verb)
}

/// (a) the player's inventory, (b) the player's environment, (c) objects in
/// the environment's inventory, in that enumeration order (§4.5 step 3).
fn candidate_objects(ctx: &DriverContext, entity: &ObjectId) -> Vec<ObjectId> {
    let mut candidates = Vec::new();
    let Some(player) = ctx.registry.find(entity.as_str()) else { return candidates };
    candidates.extend(player.inventory.iter().cloned());
    if let Some(environment) = &player.environment {
        candidates.push(environment.clone());
        if let Some(environment_entity) = ctx.registry.find(environment.as_str()) {
            candidates.extend(environment_entity.inventory.iter().cloned());
        }
    }
    candidates
}

fn handles_verb(ctx: &DriverContext, candidate: &ObjectId, verb: &str) -> bool {
    ctx.registry.find(candidate.as_str()).is_some_and(|entity| entity.handlers.contains_key(verb))
}

/// Emotes are a content unit like any other (§4.5 "soul/emote daemon
/// fallback"), conventionally cloned once at `/daemons/soul` and installed
/// with every supported emote in its `verbs()`. `@target` syntax is left to
/// that unit's own `handle_verb`, which sees the raw `args` unparsed.
fn is_known_emote(ctx: &DriverContext, verb: &str) -> bool {
    handles_verb(ctx, &ObjectId::new("/daemons/soul"), verb)
}

/// Execute `verb` against `candidate`'s own `ContentClass`, binding the
/// execution context to `(entity, candidate)` for the duration (§4.5 step
/// 5). A panicking handler is caught and reported as a dispatch failure
/// rather than tearing down the driver (§4.5 "command throws").
fn run_on_entity(
    ctx: &mut DriverContext,
    entity: &ObjectId,
    candidate: &ObjectId,
    verb: &str,
    args: &str,
) -> Result<bool, String> {
    let Some(blueprint_path) = ctx.registry.find(candidate.as_str()).map(|found| found.blueprint_path.clone())
    else {
        return Ok(false);
    };
    let Some(class) = ctx.registry.class_of(&blueprint_path) else { return Ok(false) };

    let guard = ContextGuard::push(ctx.context_stack, Some(entity.clone()), Some(candidate.clone()));
    let mut sub = sub_efuns!(ctx, Some(entity.clone()), Some(candidate.clone()));

    let outcome = {
        let Some(live) = ctx.registry.find_mut(candidate.as_str()) else {
            drop(guard);
            return Ok(false);
        };
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            class.handle_verb(verb, args, &mut live.state, &mut sub)
        }))
    };
    drop(guard);

    match outcome {
        Ok(outcome) => Ok(matches!(outcome, VerbOutcome::Handled)),
        Err(panic) => Err(panic_message(&panic)),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "content panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Config;
    use crate::state::DriverState;
    use mud_content::{CompileDiagnostic, CompiledUnit, ContentCompiler};
    use mud_core::{Capability, CapabilitySet, ContentPath, Efuns, Entity};
    use std::sync::Arc;

    struct NullCompiler;
    impl ContentCompiler for NullCompiler {
        fn compile(&self, _path: &ContentPath, _source: &str) -> Result<CompiledUnit, CompileDiagnostic> {
            Err(CompileDiagnostic::new(1, 1, "unused in tests"))
        }
    }

    struct Lookable;
    impl mud_core::ContentClass for Lookable {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::from_iter([Capability::Room, Capability::Container])
        }
        fn verbs(&self) -> Vec<String> {
            vec!["look".into()]
        }
        fn handle_verb(
            &self,
            verb: &str,
            _args: &str,
            _state: &mut serde_json::Map<String, Value>,
            efuns: &mut dyn Efuns,
        ) -> VerbOutcome {
            if verb == "look" {
                efuns.send(&efuns.this_player().unwrap(), "You see a room.");
                VerbOutcome::Handled
            } else {
                VerbOutcome::NotHandled
            }
        }
    }

    struct MutatingRoom;
    impl mud_core::ContentClass for MutatingRoom {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::from_iter([Capability::Room])
        }
        fn verbs(&self) -> Vec<String> {
            vec!["dig".into()]
        }
        fn handle_verb(
            &self,
            verb: &str,
            _args: &str,
            _state: &mut serde_json::Map<String, Value>,
            _efuns: &mut dyn Efuns,
        ) -> VerbOutcome {
            if verb == "dig" {
                VerbOutcome::Handled
            } else {
                VerbOutcome::NotHandled
            }
        }
        fn mutates_state(&self, verb: &str) -> bool {
            verb == "dig"
        }
    }

    struct Panicky;
    impl mud_core::ContentClass for Panicky {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new()
        }
        fn verbs(&self) -> Vec<String> {
            vec!["explode".into()]
        }
        fn handle_verb(
            &self,
            _verb: &str,
            _args: &str,
            _state: &mut serde_json::Map<String, Value>,
            _efuns: &mut dyn Efuns,
        ) -> VerbOutcome {
            panic!("kaboom");
        }
    }

    fn test_state() -> DriverState {
        let config = Config {
            mudlib_path: std::env::temp_dir(),
            master_object: "/master".into(),
            heartbeat_interval_ms: crate::env::DEFAULT_HEARTBEAT_INTERVAL_MS,
            hot_reload: false,
            isolate_memory_mb: crate::env::DEFAULT_ISOLATE_MEMORY_MB,
            log_level: "info".into(),
            log_pretty: false,
            tcp_port: crate::env::DEFAULT_TCP_PORT,
            start_room: crate::env::DEFAULT_START_ROOM.into(),
        };
        DriverState::new(&config, std::env::temp_dir(), Arc::new(NullCompiler))
    }

    fn place_player_in_room(state: &mut DriverState) -> (ObjectId, ObjectId) {
        let room_path = ContentPath::new("/std/room");
        state.registry.register_blueprint(room_path.clone(), Arc::new(Lookable), Entity::new_blueprint(room_path.clone())).unwrap();
        let mut efuns_context_stack = Vec::new();
        let mut pending = Vec::new();
        let room = {
            let mut ctx = state.context(&mut efuns_context_stack, &mut pending);
            ctx.clone_object("/std/room").unwrap()
        };

        let player_path = ContentPath::new("/std/player");
        state
            .registry
            .register_blueprint(player_path.clone(), Arc::new(PlainPlayer), Entity::new_blueprint(player_path.clone()))
            .unwrap();
        let player = {
            let mut ctx = state.context(&mut efuns_context_stack, &mut pending);
            ctx.clone_object("/std/player").unwrap()
        };
        state.registry.move_entity(&player, Some(room.clone())).unwrap();
        (player, room)
    }

    struct PlainPlayer;
    impl mud_core::ContentClass for PlainPlayer {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new()
        }
    }

    #[test]
    fn empty_line_is_a_silent_no_op() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, "   ", Level::Player);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn environment_handler_is_resolved_and_executed() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        state.player_sessions.insert(player.clone(), mud_core::SessionId::new("s1"));
        state.sessions.insert(mud_core::SessionId::new("s1"), crate::session::Session::new(mud_core::SessionId::new("s1")));

        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, "look", Level::Player);
        assert!(matches!(ctx.events.last(), Some(Event::CommandDispatched { verb, .. }) if verb == "look"));
    }

    #[test]
    fn unresolved_verb_tells_the_player() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, "dance", Level::Player);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn panicking_handler_is_reported_as_a_command_failure() {
        let mut state = test_state();
        let room_path = ContentPath::new("/std/explosive_room");
        state
            .registry
            .register_blueprint(room_path.clone(), Arc::new(Panicky), Entity::new_blueprint(room_path.clone()))
            .unwrap();
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let room = {
            let mut ctx = state.context(&mut stack, &mut pending);
            ctx.clone_object("/std/explosive_room").unwrap()
        };
        let player_path = ContentPath::new("/std/player2");
        state
            .registry
            .register_blueprint(player_path.clone(), Arc::new(PlainPlayer), Entity::new_blueprint(player_path.clone()))
            .unwrap();
        let player = {
            let mut ctx = state.context(&mut stack, &mut pending);
            ctx.clone_object("/std/player2").unwrap()
        };
        state.registry.move_entity(&player, Some(room)).unwrap();

        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, "explode", Level::Player);
        assert!(matches!(ctx.events.last(), Some(Event::CommandFailed { verb, .. }) if verb == "explode"));
    }

    #[test]
    fn mutating_verb_arms_a_debounced_save() {
        let mut state = test_state();
        let room_path = ContentPath::new("/std/mutating_room");
        state
            .registry
            .register_blueprint(room_path.clone(), Arc::new(MutatingRoom), Entity::new_blueprint(room_path.clone()))
            .unwrap();
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let room = {
            let mut ctx = state.context(&mut stack, &mut pending);
            ctx.clone_object("/std/mutating_room").unwrap()
        };
        let player_path = ContentPath::new("/std/player3");
        state
            .registry
            .register_blueprint(player_path.clone(), Arc::new(PlainPlayer), Entity::new_blueprint(player_path.clone()))
            .unwrap();
        let player = {
            let mut ctx = state.context(&mut stack, &mut pending);
            ctx.clone_object("/std/player3").unwrap()
        };
        state.registry.move_entity(&player, Some(room)).unwrap();

        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, "dig", Level::Player);
        assert!(ctx.pending_saves.contains_key(&player));
    }

    #[test]
    fn alias_expansion_substitutes_the_first_word_once() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        {
            let mut ctx = state.context(&mut stack, &mut pending);
            set_alias(&mut ctx, &player, "l", Some("look"));
        }
        let mut ctx = state.context(&mut stack, &mut pending);
        let expanded = expand_alias(&ctx, &player, "l");
        assert_eq!(expanded, "look");
        assert_eq!(list_aliases(&ctx, &player), vec![("l".to_string(), "look".to_string())]);
    }

    #[test]
    fn reserved_verbs_are_never_alias_substituted() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        {
            let mut ctx = state.context(&mut stack, &mut pending);
            set_alias(&mut ctx, &player, "alias", Some("look"));
        }
        let ctx = state.context(&mut stack, &mut pending);
        assert_eq!(expand_alias(&ctx, &player, "alias foo bar"), "alias foo bar");
    }

    #[test]
    fn prompt_escape_clears_the_active_prompt() {
        let mut state = test_state();
        let (player, _room) = place_player_in_room(&mut state);
        if let Some(entity) = state.registry.find_mut(player.as_str()) {
            entity.state.insert(PROMPT_STATE_KEY.to_string(), Value::String("on_editor_input".into()));
        }
        let mut stack = Vec::new();
        let mut pending = Vec::new();
        let mut ctx = state.context(&mut stack, &mut pending);
        execute_line(&mut ctx, &player, PROMPT_ESCAPE, Level::Player);
        assert!(active_prompt(&ctx, &player).is_none());
    }
}
