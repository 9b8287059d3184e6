// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal, static [`ContentCompiler`] for `.mud` source.
//!
//! World content itself is an external collaborator (spec Non-goals (a)),
//! and "dynamically evaluated code" is explicitly out of scope (Non-goal
//! (b)) — so this is not a language. Each source file is a JSON object
//! naming the capability set an instance is constructed with and a static
//! table of verb responses, e.g.:
//!
//! ```json
//! { "capabilities": ["room"], "verbs": { "look": "A plain stone room." } }
//! ```
//!
//! A real deployment that wants actual scripted behavior supplies its own
//! [`ContentCompiler`] to `main.rs`; this one exists so the driver boots
//! against a real mudlib tree out of the box.

use mud_content::{CompileDiagnostic, CompiledUnit, ContentCompiler};
use mud_core::{Capability, CapabilitySet, ContentClass, ContentPath, Efuns, VerbOutcome};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

#[derive(Debug, Deserialize)]
struct DeclarativeSource {
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    verbs: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: Vec<String>,
    /// Verb names that flag a successful dispatch as mutating persistent
    /// state (§4.5 "Save trigger"), arming the debounced player save.
    #[serde(default)]
    mutating_verbs: BTreeSet<String>,
}

fn parse_capability(name: &str) -> Option<Capability> {
    match name {
        "living" => Some(Capability::Living),
        "container" => Some(Capability::Container),
        "room" => Some(Capability::Room),
        "wanderer" => Some(Capability::Wanderer),
        "persistent" => Some(Capability::Persistent),
        _ => None,
    }
}

/// Compiles the declarative JSON format above into a [`DeclarativeClass`].
pub struct DeclarativeCompiler;

impl ContentCompiler for DeclarativeCompiler {
    fn compile(&self, path: &ContentPath, source: &str) -> Result<CompiledUnit, CompileDiagnostic> {
        let parsed: DeclarativeSource =
            serde_json::from_str(source).map_err(|err| CompileDiagnostic::new(err.line() as u32, err.column() as u32, err.to_string()))?;

        let mut capabilities = CapabilitySet::new();
        for name in &parsed.capabilities {
            match parse_capability(name) {
                Some(cap) => {
                    capabilities.insert(cap);
                }
                None => return Err(CompileDiagnostic::new(1, 1, format!("unknown capability {name} in {path}"))),
            }
        }

        let dependencies: BTreeSet<ContentPath> = parsed.dependencies.iter().map(ContentPath::new).collect();

        Ok(CompiledUnit {
            class: std::sync::Arc::new(DeclarativeClass {
                capabilities,
                verbs: parsed.verbs,
                mutating_verbs: parsed.mutating_verbs,
            }),
            fingerprint: fingerprint(source),
            dependencies,
        })
    }
}

fn fingerprint(source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// A content unit whose only behavior is a static `verb -> response line`
/// table, substituting `{args}` in the response with the verb's raw
/// argument string.
struct DeclarativeClass {
    capabilities: CapabilitySet,
    verbs: BTreeMap<String, String>,
    mutating_verbs: BTreeSet<String>,
}

impl ContentClass for DeclarativeClass {
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    fn verbs(&self) -> Vec<String> {
        self.verbs.keys().cloned().collect()
    }

    fn handle_verb(
        &self,
        verb: &str,
        args: &str,
        _state: &mut serde_json::Map<String, serde_json::Value>,
        efuns: &mut dyn Efuns,
    ) -> VerbOutcome {
        let Some(template) = self.verbs.get(verb) else { return VerbOutcome::NotHandled };
        let message = template.replace("{args}", args);
        if let Some(target) = efuns.this_player().or_else(|| efuns.this_object()) {
            efuns.send(&target, &message);
        }
        VerbOutcome::Handled
    }

    fn mutates_state(&self, verb: &str) -> bool {
        self.mutating_verbs.contains(verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEfuns {
        player: Option<mud_core::ObjectId>,
        sent: Vec<(mud_core::ObjectId, String)>,
    }
    impl Efuns for NullEfuns {
        fn find_object(&mut self, _: &str) -> Option<mud_core::ObjectId> {
            None
        }
        fn clone_object(&mut self, _: &str) -> Option<mud_core::ObjectId> {
            None
        }
        fn this_player(&self) -> Option<mud_core::ObjectId> {
            self.player.clone()
        }
        fn this_object(&self) -> Option<mud_core::ObjectId> {
            None
        }
        fn call_out(&mut self, _: &mud_core::ObjectId, _: &str, _: u64) -> String {
            String::new()
        }
        fn call_out_every(&mut self, _: &mud_core::ObjectId, _: &str, _: u64) -> String {
            String::new()
        }
        fn remove_call_out(&mut self, _: &str) -> bool {
            false
        }
        fn time(&self) -> u64 {
            0
        }
        fn send(&mut self, target: &mud_core::ObjectId, message: &str) {
            self.sent.push((target.clone(), message.to_string()));
        }
        fn call_suspending(&mut self, _: &mud_core::ObjectId, _: mud_core::SuspendingRequest, _: &str) {}
        fn remove_shadow(&mut self, _: &mud_core::ObjectId, _: &str) -> bool {
            false
        }
    }

    #[test]
    fn compiles_capabilities_and_verbs() {
        let source = r#"{"capabilities": ["room"], "verbs": {"look": "A plain room."}}"#;
        let unit = DeclarativeCompiler.compile(&ContentPath::new("/std/room"), source).unwrap();
        assert!(unit.class.capabilities().has(Capability::Room));
        assert_eq!(unit.class.verbs(), vec!["look".to_string()]);
    }

    #[test]
    fn unknown_capability_is_a_compile_error() {
        let source = r#"{"capabilities": ["flying"]}"#;
        assert!(DeclarativeCompiler.compile(&ContentPath::new("/std/room"), source).is_err());
    }

    #[test]
    fn handle_verb_substitutes_args_and_sends_to_this_player() {
        let source = r#"{"verbs": {"say": "You say: {args}"}}"#;
        let unit = DeclarativeCompiler.compile(&ContentPath::new("/std/room"), source).unwrap();
        let mut state = serde_json::Map::new();
        let mut efuns = NullEfuns { player: Some(mud_core::ObjectId::new("/std/player#0")), sent: Vec::new() };
        let outcome = unit.class.handle_verb("say", "hello", &mut state, &mut efuns);
        assert_eq!(outcome, VerbOutcome::Handled);
        assert_eq!(efuns.sent, vec![(mud_core::ObjectId::new("/std/player#0"), "You say: hello".to_string())]);
    }

    #[test]
    fn mutating_verbs_are_declared_and_everything_else_is_not() {
        let source = r#"{"verbs": {"drop": "Dropped.", "look": "A room."}, "mutating_verbs": ["drop"]}"#;
        let unit = DeclarativeCompiler.compile(&ContentPath::new("/std/room"), source).unwrap();
        assert!(unit.class.mutates_state("drop"));
        assert!(!unit.class.mutates_state("look"));
    }

    #[test]
    fn same_source_yields_the_same_fingerprint() {
        let a = fingerprint("same");
        let b = fingerprint("same");
        assert_eq!(a, b);
    }
}
