// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical in-world object (§3 Entity).

use crate::capability::{Capability, CapabilitySet};
use crate::ids::{ContentPath, ObjectId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A blueprint is the template loaded from a content unit; a clone is an
/// independent instance derived from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Blueprint,
    Clone,
}

/// Records which content unit installed a verb handler, for introspection
/// and tab-completion (§4.5); dispatch itself calls back into the owning
/// blueprint's `ContentClass`, not through this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRef {
    pub verb: String,
    pub defined_by: ContentPath,
}

/// The canonical in-world object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub object_id: ObjectId,
    pub blueprint_path: ContentPath,
    pub kind: EntityKind,
    pub environment: Option<ObjectId>,
    /// Ordered so that iteration order matches insertion order (§3 invariant 2,
    /// §4.5 verb-resolution enumeration order).
    pub inventory: IndexSet<ObjectId>,
    pub state: serde_json::Map<String, Value>,
    pub capabilities: CapabilitySet,
    pub handlers: IndexMap<String, HandlerRef>,
}

impl Entity {
    pub fn new_blueprint(blueprint_path: ContentPath) -> Self {
        let object_id = ObjectId::for_blueprint(&blueprint_path);
        Self {
            object_id,
            blueprint_path,
            kind: EntityKind::Blueprint,
            environment: None,
            inventory: IndexSet::new(),
            state: serde_json::Map::new(),
            capabilities: CapabilitySet::new(),
            handlers: IndexMap::new(),
        }
    }

    pub fn new_clone(blueprint_path: ContentPath, object_id: ObjectId) -> Self {
        Self {
            object_id,
            blueprint_path,
            kind: EntityKind::Clone,
            environment: None,
            inventory: IndexSet::new(),
            state: serde_json::Map::new(),
            capabilities: CapabilitySet::new(),
            handlers: IndexMap::new(),
        }
    }

    pub fn is_blueprint(&self) -> bool {
        matches!(self.kind, EntityKind::Blueprint)
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.has(cap)
    }

    pub fn install_handler(&mut self, verb: impl Into<String>, defined_by: ContentPath) {
        let verb = verb.into();
        self.handlers.insert(verb.clone(), HandlerRef { verb, defined_by });
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
