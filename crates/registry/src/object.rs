// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Object Registry (§4.1, C1): owns the identity of every entity.
//!
//! Single-threaded cooperative model (§4.2): callers hold `&mut
//! ObjectRegistry` for the duration of a dispatch, so there is no internal
//! locking here — the daemon wraps one instance behind the same mutex that
//! serializes the rest of the driver's logical thread.

use crate::error::RegistryError;
use indexmap::{IndexMap, IndexSet};
use mud_core::{ContentClass, ContentPath, Efuns, Entity, EntityKind, ObjectId};
use std::sync::Arc;

struct Blueprint {
    entity: Entity,
    class: Arc<dyn ContentClass>,
    next_clone: u64,
}

/// Owns every entity's identity (§3 invariant 1, §4.1).
#[derive(Default)]
pub struct ObjectRegistry {
    blueprints: IndexMap<ContentPath, Blueprint>,
    clones: IndexMap<ObjectId, Entity>,
    /// Insertion order of still-live clones per blueprint (§4.1 `iter_clones`).
    clone_order: IndexMap<ContentPath, IndexSet<ObjectId>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint's already-constructed instance (§4.1). Fails with
    /// [`RegistryError::DuplicateBlueprint`] if `path` has a live blueprint.
    pub fn register_blueprint(
        &mut self,
        path: ContentPath,
        class: Arc<dyn ContentClass>,
        instance: Entity,
    ) -> Result<(), RegistryError> {
        if self.blueprints.contains_key(&path) {
            return Err(RegistryError::DuplicateBlueprint(path));
        }
        debug_assert!(matches!(instance.kind, EntityKind::Blueprint));
        self.blueprints.insert(path.clone(), Blueprint { entity: instance, class, next_clone: 0 });
        self.clone_order.entry(path).or_default();
        Ok(())
    }

    /// Replace a blueprint's class and template instance in place, e.g. on
    /// hot reload (§4.7). Existing clones are untouched; retargeting them is
    /// the Hot-Reload Supervisor's responsibility.
    pub fn replace_blueprint(
        &mut self,
        path: &ContentPath,
        class: Arc<dyn ContentClass>,
        instance: Entity,
    ) -> Result<(), RegistryError> {
        let blueprint =
            self.blueprints.get_mut(path).ok_or_else(|| RegistryError::UnknownBlueprint(path.clone()))?;
        blueprint.class = class;
        blueprint.entity = instance;
        Ok(())
    }

    /// Unregister a blueprint record without touching its clones (used when a
    /// content unit is removed and its clones are being destroyed separately).
    pub fn unregister_blueprint(&mut self, path: &ContentPath) {
        self.blueprints.shift_remove(path);
        self.clone_order.shift_remove(path);
    }

    /// Construct a new clone by invoking the blueprint's constructor (§4.1,
    /// §3 invariant 5: construction completes before the entity is
    /// registered, so no heartbeat can observe a half-built instance).
    pub fn clone_of(&mut self, path: &ContentPath, efuns: &mut dyn Efuns) -> Result<ObjectId, RegistryError> {
        let blueprint =
            self.blueprints.get_mut(path).ok_or_else(|| RegistryError::UnknownBlueprint(path.clone()))?;

        let sequence = blueprint.next_clone;
        blueprint.next_clone += 1;
        let object_id = ObjectId::for_clone(path, sequence);

        let mut entity = Entity::new_clone(path.clone(), object_id.clone());
        entity.capabilities = blueprint.class.capabilities();
        for verb in blueprint.class.verbs() {
            entity.install_handler(verb, path.clone());
        }
        blueprint.class.construct(&mut entity.state, efuns);

        self.clones.insert(object_id.clone(), entity);
        self.clone_order.entry(path.clone()).or_default().insert(object_id.clone());
        Ok(object_id)
    }

    /// Blueprints by path, clones by full `path#n` id (§4.1).
    pub fn find(&self, path_or_id: &str) -> Option<&Entity> {
        if let Some(entity) = self.clones.get(path_or_id) {
            return Some(entity);
        }
        self.blueprints.get(path_or_id).map(|b| &b.entity)
    }

    pub fn find_mut(&mut self, path_or_id: &str) -> Option<&mut Entity> {
        if self.clones.contains_key(path_or_id) {
            return self.clones.get_mut(path_or_id);
        }
        self.blueprints.get_mut(path_or_id).map(|b| &mut b.entity)
    }

    pub fn class_of(&self, path: &ContentPath) -> Option<Arc<dyn ContentClass>> {
        self.blueprints.get(path).map(|b| Arc::clone(&b.class))
    }

    /// Move `entity` into `new_environment` (or out of any environment if
    /// `None`), atomically updating both sides of containment (§3 invariant 2).
    pub fn move_entity(
        &mut self,
        entity: &ObjectId,
        new_environment: Option<ObjectId>,
    ) -> Result<(), RegistryError> {
        if !entity.is_clone() {
            return Err(RegistryError::BlueprintCannotBeContained(entity.clone()));
        }
        let old_environment = self
            .clones
            .get(entity)
            .ok_or_else(|| RegistryError::NotFound(entity.clone()))?
            .environment
            .clone();

        if let Some(old) = &old_environment {
            if let Some(old_entity) = self.clones.get_mut(old) {
                old_entity.inventory.shift_remove(entity);
            }
        }
        if let Some(new) = &new_environment {
            if let Some(new_entity) = self.clones.get_mut(new) {
                new_entity.inventory.insert(entity.clone());
            }
        }
        if let Some(entity_mut) = self.clones.get_mut(entity) {
            entity_mut.environment = new_environment;
        }
        Ok(())
    }

    /// Remove `id` and, recursively, every entity still in its inventory
    /// (§4.1 "each child recursively destroyed ... per content policy" — this
    /// registry's policy is recursive destruction; re-parenting is a content
    /// decision made before calling `destroy`, e.g. by moving children out
    /// first). Returns every id actually removed, deepest first, so the
    /// caller can cancel scheduled tasks and detach shadows for each one —
    /// those live in separate crates and are not this registry's concern.
    pub fn destroy(&mut self, id: &ObjectId) -> Result<Vec<ObjectId>, RegistryError> {
        let entity = self.clones.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let children: Vec<ObjectId> = entity.inventory.iter().cloned().collect();
        let environment = entity.environment.clone();

        let mut removed = Vec::new();
        for child in children {
            removed.extend(self.destroy(&child)?);
        }

        if let Some(env) = &environment {
            if let Some(env_entity) = self.clones.get_mut(env) {
                env_entity.inventory.shift_remove(id);
            }
        }
        let entity = self.clones.shift_remove(id).ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if let Some(order) = self.clone_order.get_mut(&entity.blueprint_path) {
            order.shift_remove(id);
        }
        removed.push(id.clone());
        Ok(removed)
    }

    /// Stable insertion order of still-live clones of `path` (§4.1).
    pub fn iter_clones(&self, path: &ContentPath) -> impl Iterator<Item = &ObjectId> {
        self.clone_order.get(path).into_iter().flat_map(|set| set.iter())
    }
}
