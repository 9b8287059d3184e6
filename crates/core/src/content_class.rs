// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the driver and content units (§4.10, §9).
//!
//! The world-content library itself is an external collaborator (spec
//! Non-goals (a)/(b)): the driver only supervises loading and replacement of
//! compiled content units, represented here as `Arc<dyn ContentClass>`
//! trait objects rather than dynamically evaluated source. [`Efuns`] is the
//! fixed, object-safe extension surface those units call back through;
//! suspending operations (`save_player`, `load_player_data`, `read_file`,
//! …) are modeled as explicit async-queue requests rather than futures
//! handed to content, per the §9 redesign note.

use crate::capability::CapabilitySet;
use crate::ids::ObjectId;
use serde_json::Value;
use std::fmt;

/// Result of attempting to handle a dispatched verb (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbOutcome {
    /// The verb was handled; dispatch stops here.
    Handled,
    /// This handler declined; the dispatcher falls through to the next
    /// resolution level (§4.5 "Command returns handled=false").
    NotHandled,
}

/// A fixed-shape I/O request a content unit may issue without being handed
/// a future (§5 "Suspension points", §9).
#[derive(Debug, Clone, PartialEq)]
pub enum SuspendingRequest {
    SavePlayer { entity: ObjectId },
    LoadPlayerData { name: String },
    ReadFile { path: String },
    WriteFile { path: String, data: String },
}

/// The fixed, object-safe extension surface content code calls (§4.10).
///
/// Implemented once by the driver's runtime context and passed to
/// [`ContentClass`] methods by reference; never exposed outside a dispatch.
pub trait Efuns {
    // --- Object ---
    fn find_object(&mut self, path_or_id: &str) -> Option<ObjectId>;
    fn clone_object(&mut self, path: &str) -> Option<ObjectId>;
    fn this_player(&self) -> Option<ObjectId>;
    fn this_object(&self) -> Option<ObjectId>;

    // --- Time & tasks ---
    fn call_out(&mut self, target: &ObjectId, callback: &str, delay_ms: u64) -> String;
    fn call_out_every(&mut self, target: &ObjectId, callback: &str, interval_ms: u64) -> String;
    fn remove_call_out(&mut self, task_id: &str) -> bool;
    fn time(&self) -> u64;

    // --- Messaging ---
    fn send(&mut self, target: &ObjectId, message: &str);

    // --- Suspending (§5) ---
    /// Queue a suspending I/O request; the result is delivered later as an
    /// `on_call_out(resume, ..)` invocation on `target` (§5, §9).
    fn call_suspending(&mut self, target: &ObjectId, request: SuspendingRequest, resume: &str);

    // --- Shadows ---
    fn remove_shadow(&mut self, target: &ObjectId, shadow_type: &str) -> bool;
}

/// The fixed behavior vtable for a content unit (§9 "the shadowable set is
/// closed and small, so static dispatch is sufficient" — the same applies
/// to content classes generally).
pub trait ContentClass: Send + Sync {
    /// The capability set this content unit constructs its instances with.
    fn capabilities(&self) -> CapabilitySet;

    /// Verbs this content unit installs a handler for.
    fn verbs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Initialize a freshly created instance's state (§3 "construction runs
    /// to completion before the entity is registered").
    fn construct(&self, _state: &mut serde_json::Map<String, Value>, _efuns: &mut dyn Efuns) {}

    /// Handle a verb dispatched to an entity of this class.
    fn handle_verb(
        &self,
        _verb: &str,
        _args: &str,
        _state: &mut serde_json::Map<String, Value>,
        _efuns: &mut dyn Efuns,
    ) -> VerbOutcome {
        VerbOutcome::NotHandled
    }

    /// Whether a successful `verb` dispatch flagged itself as mutating
    /// persistent player state, arming a debounced save (§4.5 "Save
    /// trigger"). Most verbs don't; a handler that changes something worth
    /// persisting overrides this for those verb names.
    fn mutates_state(&self, _verb: &str) -> bool {
        false
    }

    /// Called once per tick for every heartbeat-registered instance (§4.2).
    fn on_heartbeat(&self, _state: &mut serde_json::Map<String, Value>, _efuns: &mut dyn Efuns) {}

    /// Called on each retargeted clone after a hot reload, if defined (§4.7).
    fn on_hot_reload(&self, _state: &mut serde_json::Map<String, Value>, _efuns: &mut dyn Efuns) {}

    /// Called when an instance is destroyed, before the registry drops it.
    fn on_destroy(&self, _state: &mut serde_json::Map<String, Value>, _efuns: &mut dyn Efuns) {}

    /// Resume a suspended continuation (`call_out`/`call_suspending`) by name.
    fn on_call_out(
        &self,
        _callback: &str,
        _result: &Value,
        _state: &mut serde_json::Map<String, Value>,
        _efuns: &mut dyn Efuns,
    ) {
    }

    /// Compute a property value, if this class overrides how it's derived;
    /// `None` falls back to reading `state` directly.
    fn property(&self, _name: &str, _state: &serde_json::Map<String, Value>) -> Option<Value> {
        None
    }
}

impl fmt::Debug for dyn ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentClass(caps={:?}, verbs={:?})", self.capabilities(), self.verbs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;

    struct NullEfuns;
    impl Efuns for NullEfuns {
        fn find_object(&mut self, _: &str) -> Option<ObjectId> {
            None
        }
        fn clone_object(&mut self, _: &str) -> Option<ObjectId> {
            None
        }
        fn this_player(&self) -> Option<ObjectId> {
            None
        }
        fn this_object(&self) -> Option<ObjectId> {
            None
        }
        fn call_out(&mut self, _: &ObjectId, _: &str, _: u64) -> String {
            String::new()
        }
        fn call_out_every(&mut self, _: &ObjectId, _: &str, _: u64) -> String {
            String::new()
        }
        fn remove_call_out(&mut self, _: &str) -> bool {
            false
        }
        fn time(&self) -> u64 {
            0
        }
        fn send(&mut self, _: &ObjectId, _: &str) {}
        fn call_suspending(&mut self, _: &ObjectId, _: SuspendingRequest, _: &str) {}
        fn remove_shadow(&mut self, _: &ObjectId, _: &str) -> bool {
            false
        }
    }

    struct Room;
    impl ContentClass for Room {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::from_iter([Capability::Room, Capability::Container])
        }

        fn handle_verb(
            &self,
            verb: &str,
            _args: &str,
            _state: &mut serde_json::Map<String, Value>,
            _efuns: &mut dyn Efuns,
        ) -> VerbOutcome {
            if verb == "look" {
                VerbOutcome::Handled
            } else {
                VerbOutcome::NotHandled
            }
        }
    }

    #[test]
    fn default_hooks_are_no_ops_and_do_not_panic() {
        let room = Room;
        let mut state = serde_json::Map::new();
        let mut efuns = NullEfuns;
        room.on_heartbeat(&mut state, &mut efuns);
        room.on_hot_reload(&mut state, &mut efuns);
        room.on_destroy(&mut state, &mut efuns);
        assert_eq!(room.property("anything", &state), None);
    }

    #[test]
    fn unhandled_verb_falls_through() {
        let room = Room;
        let mut state = serde_json::Map::new();
        let mut efuns = NullEfuns;
        assert_eq!(
            room.handle_verb("dance", "", &mut state, &mut efuns),
            VerbOutcome::NotHandled
        );
        assert_eq!(room.handle_verb("look", "", &mut state, &mut efuns), VerbOutcome::Handled);
    }
}
