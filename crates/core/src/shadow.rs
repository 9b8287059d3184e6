// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shadow overlay records (§3 Shadow, §4.6).
//!
//! A shadow's behavior is a small vtable (the "decorated object" design note
//! in §9): a fixed, closed set of overridable properties/methods rather than
//! a dynamic proxy. [`ShadowClass`] is that vtable; [`Shadow`] is the
//! per-attachment record the registry orders by priority.

use crate::ids::{ObjectId, ShadowType};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Behavior a shadow overlays onto its target. Object-safe so shadows can be
/// stored as `Arc<dyn ShadowClass>` in the registry's priority-ordered list.
pub trait ShadowClass: Send + Sync {
    fn shadow_type(&self) -> ShadowType;

    /// Called once, after the shadow is inserted into the target's list.
    fn on_attach(&self, _target: &ObjectId) {}

    /// Called once, before the shadow is removed from the target's list.
    fn on_detach(&self, _target: &ObjectId) {}

    /// `Some(value)` if this shadow overrides the named property; `None`
    /// falls through to the next shadow (or the entity's own value).
    fn override_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// `true` if this shadow intercepts calls to `verb`. When it does, the
    /// dispatcher invokes [`Self::handle_method`] with `self`/`this` bound
    /// to the shadow rather than the target (§4.6).
    fn overrides_method(&self, _verb: &str) -> bool {
        false
    }

    /// Handle a method this shadow claimed via [`Self::overrides_method`].
    /// Returns `true` if the call was handled.
    fn handle_method(&self, _verb: &str, _args: &str) -> bool {
        false
    }
}

impl fmt::Debug for dyn ShadowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShadowClass({})", self.shadow_type())
    }
}

/// An overlay record keyed by `(target, shadow_type)` (§3).
#[derive(Clone)]
pub struct Shadow {
    pub target: Option<ObjectId>,
    pub priority: i32,
    pub active: bool,
    pub class: Arc<dyn ShadowClass>,
}

impl fmt::Debug for Shadow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shadow")
            .field("target", &self.target)
            .field("shadow_type", &self.class.shadow_type())
            .field("priority", &self.priority)
            .field("active", &self.active)
            .finish()
    }
}

impl Shadow {
    pub fn new(priority: i32, class: Arc<dyn ShadowClass>) -> Self {
        Self { target: None, priority, active: true, class }
    }

    pub fn shadow_type(&self) -> ShadowType {
        self.class.shadow_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NameShadow(&'static str);
    impl ShadowClass for NameShadow {
        fn shadow_type(&self) -> ShadowType {
            ShadowType::new("name_override")
        }

        fn override_property(&self, name: &str) -> Option<Value> {
            (name == "name").then(|| Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn override_property_returns_none_for_other_names() {
        let shadow = Shadow::new(0, Arc::new(NameShadow("Alice the Werewolf")));
        assert_eq!(shadow.class.override_property("description"), None);
        assert_eq!(
            shadow.class.override_property("name"),
            Some(Value::String("Alice the Werewolf".into()))
        );
    }

    #[test]
    fn new_shadow_has_no_target_until_attached() {
        let shadow = Shadow::new(5, Arc::new(NameShadow("x")));
        assert!(shadow.target.is_none());
        assert!(shadow.active);
    }
}
