// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracked dependency graph for transitive reload ordering (§4.7 step 5).

use indexmap::IndexSet;
use mud_core::ContentPath;
use std::collections::{BTreeSet, VecDeque};

/// `dependents[p]` is the set of units that declared a dependency on `p`.
#[derive(Default)]
pub struct DependencyGraph {
    dependents: std::collections::HashMap<ContentPath, BTreeSet<ContentPath>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` depends on each of `dependencies` (the edges run
    /// dependency -> dependent, since reload needs to walk forward from a
    /// changed unit to whatever relies on it).
    pub fn set_dependencies(&mut self, path: &ContentPath, dependencies: &BTreeSet<ContentPath>) {
        for (dependency, dependents) in self.dependents.iter_mut() {
            if dependency != path {
                dependents.remove(path);
            }
        }
        for dependency in dependencies {
            self.dependents.entry(dependency.clone()).or_default().insert(path.clone());
        }
    }

    pub fn remove(&mut self, path: &ContentPath) {
        self.dependents.remove(path);
        for dependents in self.dependents.values_mut() {
            dependents.remove(path);
        }
    }

    pub fn direct_dependents_of(&self, path: &ContentPath) -> BTreeSet<ContentPath> {
        self.dependents.get(path).cloned().unwrap_or_default()
    }

    /// Breadth-first reload order starting at `changed`: `changed` itself
    /// first, then its dependents, transitively, each unit appearing at
    /// most once even if reachable through more than one path (§4.7 "cycles
    /// are broken by updating each unit at most once per batch").
    pub fn reload_order(&self, changed: &ContentPath) -> Vec<ContentPath> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::new();
        seen.insert(changed.clone());
        queue.push_back(changed.clone());

        while let Some(path) = queue.pop_front() {
            for dependent in self.direct_dependents_of(&path) {
                if seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        seen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ContentPath {
        ContentPath::new(s)
    }

    #[test]
    fn reload_order_starts_with_the_changed_unit() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.reload_order(&path("/domain/room")), vec![path("/domain/room")]);
    }

    #[test]
    fn direct_and_transitive_dependents_are_included_once() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&path("/domain/sub_room"), &BTreeSet::from([path("/std/room")]));
        graph.set_dependencies(&path("/domain/furnished_room"), &BTreeSet::from([path("/domain/sub_room")]));

        let order = graph.reload_order(&path("/std/room"));
        assert_eq!(order, vec![path("/std/room"), path("/domain/sub_room"), path("/domain/furnished_room")]);
    }

    #[test]
    fn cycles_do_not_loop_forever_and_each_unit_appears_once() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&path("/a"), &BTreeSet::from([path("/b")]));
        graph.set_dependencies(&path("/b"), &BTreeSet::from([path("/a")]));

        let order = graph.reload_order(&path("/a"));
        assert_eq!(order.len(), 2);
        assert!(order.contains(&path("/a")));
        assert!(order.contains(&path("/b")));
    }

    #[test]
    fn set_dependencies_replaces_a_units_prior_edges() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&path("/domain/room"), &BTreeSet::from([path("/std/room")]));
        graph.set_dependencies(&path("/domain/room"), &BTreeSet::from([path("/std/other")]));

        assert!(graph.direct_dependents_of(&path("/std/room")).is_empty());
        assert!(graph.direct_dependents_of(&path("/std/other")).contains(&path("/domain/room")));
    }
}
