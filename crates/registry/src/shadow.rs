// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Shadow Registry (§4.6, C6): property/method overlays on entities.

use crate::error::RegistryError;
use indexmap::IndexMap;
use mud_core::{ObjectId, Shadow, ShadowType};
use serde_json::Value;

/// Priority-ordered overlays per target (§3 invariant 6, §4.6).
#[derive(Default)]
pub struct ShadowRegistry {
    shadows: IndexMap<ObjectId, Vec<Shadow>>,
}

impl ShadowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `shadow` to `target`. Fails if a shadow of the same
    /// `shadow_type` is already on `target`. Inserts into the target's list
    /// sorted by descending priority, ties broken by insertion order, then
    /// invokes `on_attach` (§4.6).
    pub fn add_shadow(&mut self, target: ObjectId, mut shadow: Shadow) -> Result<(), RegistryError> {
        let list = self.shadows.entry(target.clone()).or_default();
        if list.iter().any(|s| s.shadow_type() == shadow.shadow_type()) {
            return Err(RegistryError::DuplicateShadow { target, shadow_type: shadow.shadow_type() });
        }
        shadow.target = Some(target.clone());
        shadow.class.on_attach(&target);

        // Stable insertion point: first position whose priority is strictly
        // lower than the new shadow's, so equal priorities keep arrival order.
        let index = list.iter().position(|s| s.priority < shadow.priority).unwrap_or(list.len());
        list.insert(index, shadow);
        Ok(())
    }

    /// Detach the shadow of `shadow_type` from `target`, invoking `on_detach`
    /// first (§4.6). If the list becomes empty the entry is dropped entirely.
    pub fn remove_shadow(&mut self, target: &ObjectId, shadow_type: &ShadowType) -> Result<(), RegistryError> {
        let list = self.shadows.get_mut(target).ok_or_else(|| RegistryError::UnknownShadow {
            target: target.clone(),
            shadow_type: shadow_type.clone(),
        })?;
        let position = list.iter().position(|s| &s.shadow_type() == shadow_type).ok_or_else(|| {
            RegistryError::UnknownShadow { target: target.clone(), shadow_type: shadow_type.clone() }
        })?;
        let shadow = list.remove(position);
        shadow.class.on_detach(target);
        if list.is_empty() {
            self.shadows.shift_remove(target);
        }
        Ok(())
    }

    /// Best-effort detach of every shadow on `target`, in priority order,
    /// swallowing nothing but logging nothing either — the caller (§4.1
    /// `destroy`, "errors logged") is responsible for observing failures via
    /// tracing spans around this call.
    pub fn remove_all_for(&mut self, target: &ObjectId) {
        if let Some(list) = self.shadows.shift_remove(target) {
            for shadow in list {
                shadow.class.on_detach(target);
            }
        }
    }

    /// Priority-ordered, read-only view of `target`'s shadows (§4.6).
    pub fn get_shadows(&self, target: &ObjectId) -> &[Shadow] {
        self.shadows.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a shadowed property read: the first active shadow (in
    /// priority order) that overrides `name` supplies the value (§4.6).
    pub fn resolve_property(&self, target: &ObjectId, name: &str) -> Option<Value> {
        self.get_shadows(target)
            .iter()
            .filter(|s| s.active)
            .find_map(|s| s.class.override_property(name))
    }

    /// The first active shadow (priority order) that claims `verb`, if any
    /// (§4.6 "this/self inside that method refers to the shadow").
    pub fn resolve_method(&self, target: &ObjectId, verb: &str) -> Option<&Shadow> {
        self.get_shadows(target).iter().filter(|s| s.active).find(|s| s.class.overrides_method(verb))
    }
}
