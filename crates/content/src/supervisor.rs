// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties compilation, the dependency graph, debouncing and the safelist
//! together into the hot-reload workflow of §4.7.

use crate::compiler::ContentCompiler;
use crate::debounce::Debouncer;
use crate::dependency::DependencyGraph;
use crate::error::ContentError;
use crate::safelist::Safelist;
use indexmap::IndexMap;
use mud_core::{Clock, ContentPath, Efuns, Entity, ObjectId};
use mud_registry::ObjectRegistry;
use std::sync::Arc;

/// Result of a single unit's reload attempt (§4.7 steps 2-4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Source was unchanged since the last successful compile; no-op (§8).
    Unchanged,
    /// First-ever load of this path.
    Registered,
    /// An existing blueprint was swapped and its live clones retargeted.
    Reloaded { retargeted_clones: usize },
}

/// Outcome of reloading a changed unit and its transitive dependents
/// (§4.7 step 5/7).
#[derive(Debug, Default)]
pub struct ReloadBatchReport {
    pub succeeded: Vec<(ContentPath, ReloadOutcome)>,
    pub failed: Vec<(ContentPath, ContentError)>,
}

/// Coordinates compilation, debouncing, the dependency graph, and the
/// safelist. Watching the filesystem itself lives in [`crate::watcher`];
/// this type only knows how to turn "path `P` changed" into registry
/// mutations.
pub struct ContentSupervisor<C: Clock> {
    compiler: Arc<dyn ContentCompiler>,
    safelist: Safelist,
    debounce: Debouncer<C>,
    graph: DependencyGraph,
    fingerprints: IndexMap<ContentPath, String>,
}

impl<C: Clock> ContentSupervisor<C> {
    pub fn new(clock: C, compiler: Arc<dyn ContentCompiler>) -> Self {
        Self {
            compiler,
            safelist: Safelist::default(),
            debounce: Debouncer::new(clock),
            graph: DependencyGraph::new(),
            fingerprints: IndexMap::new(),
        }
    }

    pub fn with_safelist(mut self, safelist: Safelist) -> Self {
        self.safelist = safelist;
        self
    }

    /// Override the default 100ms debounce window (§4.7 step 6).
    pub fn with_debounce_window_ms(clock: C, compiler: Arc<dyn ContentCompiler>, window_ms: u64) -> Self {
        Self {
            compiler,
            safelist: Safelist::default(),
            debounce: Debouncer::with_window_ms(clock, window_ms),
            graph: DependencyGraph::new(),
            fingerprints: IndexMap::new(),
        }
    }

    /// Record that `path`'s source changed, starting (or restarting) its
    /// debounce window (§4.7 step 6).
    pub fn note_change(&mut self, path: ContentPath) {
        self.debounce.record(path);
    }

    /// Paths whose debounce window has elapsed and are ready to reload.
    pub fn ready_paths(&mut self) -> Vec<ContentPath> {
        self.debounce.drain_ready()
    }

    /// Reload `changed` and everything that transitively depends on it, in
    /// topological order, isolating failures per unit (§4.7 steps 5/7).
    /// `sources` fetches the current source text for a path; a path with no
    /// source available (e.g. deleted mid-batch) is skipped.
    pub fn reload_tree(
        &mut self,
        changed: &ContentPath,
        sources: &dyn Fn(&ContentPath) -> Option<String>,
        registry: &mut ObjectRegistry,
        efuns: &mut dyn Efuns,
    ) -> ReloadBatchReport {
        let mut report = ReloadBatchReport::default();
        for path in self.graph.reload_order(changed) {
            let Some(source) = sources(&path) else { continue };
            match self.reload(&path, &source, registry, efuns) {
                Ok(outcome) => report.succeeded.push((path, outcome)),
                Err(err) => report.failed.push((path, err)),
            }
        }
        report
    }

    /// Reload (or, if unknown, register) a single content unit (§4.7 steps
    /// 1-4). The prior version remains live on any failure.
    pub fn reload(
        &mut self,
        path: &ContentPath,
        source: &str,
        registry: &mut ObjectRegistry,
        efuns: &mut dyn Efuns,
    ) -> Result<ReloadOutcome, ContentError> {
        if self.safelist.requires_confirmation(path) {
            return Err(ContentError::Safelisted(path.clone()));
        }

        let compiled = self
            .compiler
            .compile(path, source)
            .map_err(|diagnostic| ContentError::CompileFailed { path: path.clone(), diagnostic })?;

        if self.fingerprints.get(path) == Some(&compiled.fingerprint) {
            return Ok(ReloadOutcome::Unchanged);
        }

        let already_registered = registry.class_of(path).is_some();
        let outcome = if already_registered {
            registry.replace_blueprint(path, Arc::clone(&compiled.class), Entity::new_blueprint(path.clone()))?;
            let retargeted = self.retarget_clones(path, &compiled.class, registry, efuns);
            ReloadOutcome::Reloaded { retargeted_clones: retargeted }
        } else {
            registry.register_blueprint(path.clone(), Arc::clone(&compiled.class), Entity::new_blueprint(path.clone()))?;
            ReloadOutcome::Registered
        };

        self.graph.set_dependencies(path, &compiled.dependencies);
        self.fingerprints.insert(path.clone(), compiled.fingerprint);
        Ok(outcome)
    }

    /// Redirect every live clone of `path` at `class` without touching a
    /// single field of its state (§4.7 step 3/4).
    fn retarget_clones(
        &self,
        path: &ContentPath,
        class: &Arc<dyn mud_core::ContentClass>,
        registry: &mut ObjectRegistry,
        efuns: &mut dyn Efuns,
    ) -> usize {
        let ids: Vec<ObjectId> = registry.iter_clones(path).cloned().collect();
        let mut retargeted = 0;
        for id in &ids {
            if let Some(entity) = registry.find_mut(id.as_str()) {
                entity.capabilities = class.capabilities();
                entity.handlers.clear();
                for verb in class.verbs() {
                    entity.install_handler(verb, path.clone());
                }
                class.on_hot_reload(&mut entity.state, efuns);
                retargeted += 1;
            }
        }
        retargeted
    }

    /// Destroy a deleted unit's blueprint and all of its clones in
    /// registration order (§4.7 "Deletion"). Task cancellation is the
    /// caller's responsibility, same as [`ObjectRegistry::destroy`].
    pub fn delete(&mut self, path: &ContentPath, registry: &mut ObjectRegistry) -> Result<Vec<ObjectId>, ContentError> {
        let ids: Vec<ObjectId> = registry.iter_clones(path).cloned().collect();
        let mut removed = Vec::new();
        for id in ids {
            if registry.find(id.as_str()).is_some() {
                removed.extend(registry.destroy(&id)?);
            }
        }
        registry.unregister_blueprint(path);
        self.graph.remove(path);
        self.fingerprints.shift_remove(path);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::ScriptedCompiler;
    use mud_core::{FakeClock, SuspendingRequest};
    use std::collections::BTreeMap;

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

    fn supervisor() -> ContentSupervisor<FakeClock> {
        ContentSupervisor::new(FakeClock::new(), Arc::new(ScriptedCompiler))
    }

    #[test]
    fn first_reload_of_an_unknown_path_registers_it() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let path = ContentPath::new("/domain/room");
        let outcome = sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();
        assert_eq!(outcome, ReloadOutcome::Registered);
        assert!(reg.class_of(&path).is_some());
    }

    #[test]
    fn compile_failure_leaves_the_prior_version_live() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let path = ContentPath::new("/domain/room");
        sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();

        let err = sup.reload(&path, "fail", &mut reg, &mut efuns);
        assert!(matches!(err, Err(ContentError::CompileFailed { .. })));
        assert!(reg.find(path.as_str()).unwrap().handlers.contains_key("hello"));
    }

    #[test]
    fn identical_source_reload_is_a_no_op() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let path = ContentPath::new("/domain/room");
        sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();
        let outcome = sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();
        assert_eq!(outcome, ReloadOutcome::Unchanged);
    }

    #[test]
    fn reload_retargets_live_clones_and_preserves_state() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let path = ContentPath::new("/domain/room");
        sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();

        let clone_id = reg.clone_of(&path, &mut efuns).unwrap();
        reg.find_mut(clone_id.as_str()).unwrap().state.insert("hp".into(), serde_json::json!(42));

        let outcome = sup.reload(&path, "goodbye", &mut reg, &mut efuns).unwrap();
        assert_eq!(outcome, ReloadOutcome::Reloaded { retargeted_clones: 1 });

        let entity = reg.find(clone_id.as_str()).unwrap();
        assert_eq!(entity.state.get("hp"), Some(&serde_json::json!(42)));
        assert_eq!(entity.state.get("reloaded"), Some(&serde_json::json!(true)));
        assert!(entity.handlers.contains_key("goodbye"));
        assert!(!entity.handlers.contains_key("hello"));
    }

    #[test]
    fn safelisted_paths_reject_reload() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let err = sup.reload(&ContentPath::new("/std/player/base"), "hello", &mut reg, &mut efuns);
        assert!(matches!(err, Err(ContentError::Safelisted(_))));
    }

    #[test]
    fn reload_tree_cascades_to_dependents_in_order_and_isolates_failures() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;

        let base = ContentPath::new("/std/room");
        let child = ContentPath::new("/domain/sub_room");
        let grandchild = ContentPath::new("/domain/bad_room");

        sup.reload(&base, "base", &mut reg, &mut efuns).unwrap();
        sup.reload(&child, "deps:/std/room", &mut reg, &mut efuns).unwrap();
        sup.reload(&grandchild, "deps:/domain/sub_room", &mut reg, &mut efuns).unwrap();

        let mut sources = BTreeMap::new();
        sources.insert(base.clone(), "base2".to_string());
        sources.insert(child.clone(), "deps:/std/room".to_string());
        sources.insert(grandchild.clone(), "fail".to_string());

        let report = sup.reload_tree(&base, &|p| sources.get(p).cloned(), &mut reg, &mut efuns);
        assert_eq!(report.succeeded.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(), vec![base.clone(), child.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, grandchild);
        // The grandchild's previous compiled class is still live.
        assert!(reg.class_of(&grandchild).is_some());
    }

    #[test]
    fn delete_destroys_the_blueprint_and_all_its_clones() {
        let mut sup = supervisor();
        let mut reg = ObjectRegistry::new();
        let mut efuns = NullEfuns;
        let path = ContentPath::new("/domain/item");
        sup.reload(&path, "hello", &mut reg, &mut efuns).unwrap();
        let a = reg.clone_of(&path, &mut efuns).unwrap();
        let b = reg.clone_of(&path, &mut efuns).unwrap();

        let removed = sup.delete(&path, &mut reg).unwrap();
        assert!(removed.contains(&a));
        assert!(removed.contains(&b));
        assert!(reg.find(a.as_str()).is_none());
        assert!(reg.class_of(&path).is_none());
    }
}
