// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A loaded blueprint source file (§3 Content Unit, §4.7).

use crate::content_class::ContentClass;
use crate::ids::{ContentPath, ObjectId};
use indexmap::IndexSet;
use std::collections::BTreeSet;
use std::sync::Arc;

/// `{path, source_fingerprint, class_constructor, dependent_paths, clone_ids}` (§3).
#[derive(Clone)]
pub struct ContentUnit {
    pub path: ContentPath,
    /// Hash of the compiled unit's source, used to detect no-op reloads
    /// (§8 "Compile-succeeded hot-reload twice in a row with identical
    /// source is a no-op after the first").
    pub source_fingerprint: String,
    pub class: Arc<dyn ContentClass>,
    pub dependent_paths: BTreeSet<ContentPath>,
    pub clone_ids: IndexSet<ObjectId>,
}

impl ContentUnit {
    pub fn new(path: ContentPath, source_fingerprint: String, class: Arc<dyn ContentClass>) -> Self {
        Self { path, source_fingerprint, class, dependent_paths: BTreeSet::new(), clone_ids: IndexSet::new() }
    }
}

impl std::fmt::Debug for ContentUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentUnit")
            .field("path", &self.path)
            .field("source_fingerprint", &self.source_fingerprint)
            .field("dependent_paths", &self.dependent_paths)
            .field("clone_count", &self.clone_ids.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use crate::content_class::Efuns;

    struct Stub;
    impl ContentClass for Stub {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new()
        }
    }

    #[allow(dead_code)]
    fn assert_object_safe(_efuns: &mut dyn Efuns) {}

    #[test]
    fn new_unit_starts_with_no_dependents_or_clones() {
        let unit = ContentUnit::new(ContentPath::new("/std/item"), "abc123".into(), Arc::new(Stub));
        assert!(unit.dependent_paths.is_empty());
        assert!(unit.clone_ids.is_empty());
    }
}
