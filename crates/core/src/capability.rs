// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability flags (§3 Entity, §9 "Class inheritance in content").
//!
//! Content units declare the capability set they satisfy instead of
//! participating in a class hierarchy; the dispatcher and containers test
//! for capabilities rather than types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Living,
    Container,
    Room,
    Wanderer,
    Persistent,
}

crate::simple_display! {
    Capability {
        Living => "living",
        Container => "container",
        Room => "room",
        Wanderer => "wanderer",
        Persistent => "persistent",
    }
}

/// The capability set an entity was constructed with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self(caps.into_iter().collect())
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    pub fn insert(&mut self, cap: Capability) -> bool {
        self.0.insert(cap)
    }

    pub fn remove(&mut self, cap: Capability) -> bool {
        self.0.remove(&cap)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_reflects_membership() {
        let mut caps = CapabilitySet::new();
        assert!(!caps.has(Capability::Living));
        caps.insert(Capability::Living);
        assert!(caps.has(Capability::Living));
    }

    #[test]
    fn remove_clears_membership() {
        let mut caps = CapabilitySet::from_iter([Capability::Room, Capability::Container]);
        assert!(caps.remove(Capability::Room));
        assert!(!caps.has(Capability::Room));
        assert!(caps.has(Capability::Container));
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(Capability::Wanderer.to_string(), "wanderer");
    }
}
