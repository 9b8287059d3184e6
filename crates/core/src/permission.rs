// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission levels and grants (§3 Permission Grant, §4.8).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Four monotonically increasing permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Player,
    Builder,
    SeniorBuilder,
    Administrator,
}

crate::simple_display! {
    Level {
        Player => "player",
        Builder => "builder",
        SeniorBuilder => "senior_builder",
        Administrator => "administrator",
    }
}

impl Level {
    /// The dispatcher scope directory a level may execute commands from
    /// (`/cmds/<scope>/<verb>`), most to least privileged, inclusive of all
    /// scopes at or below this level.
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Level::Player => &["player"],
            Level::Builder => &["player", "builder"],
            Level::SeniorBuilder => &["player", "builder"],
            Level::Administrator => &["player", "builder", "admin"],
        }
    }
}

/// A subject's permission level plus the domain prefixes they may write
/// under (§3, §4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub subject_name: String,
    pub level: Level,
    pub domains: BTreeSet<String>,
}

impl PermissionGrant {
    pub fn new(subject_name: impl Into<String>, level: Level) -> Self {
        Self { subject_name: normalize_subject(&subject_name.into()), level, domains: BTreeSet::new() }
    }

    pub fn with_domain(mut self, prefix: impl Into<String>) -> Self {
        self.domains.insert(prefix.into());
        self
    }

    /// `true` if `path` falls under one of this subject's domains.
    pub fn owns_domain_for(&self, path: &str) -> bool {
        self.domains.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Case-normalize a subject name (§4.8: "Subject names are case-normalized").
pub fn normalize_subject(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_monotonically() {
        assert!(Level::Player < Level::Builder);
        assert!(Level::Builder < Level::SeniorBuilder);
        assert!(Level::SeniorBuilder < Level::Administrator);
    }

    #[test]
    fn owns_domain_for_matches_prefix() {
        let grant = PermissionGrant::new("Bob", Level::Builder).with_domain("/areas/castle/");
        assert!(grant.owns_domain_for("/areas/castle/room.rs"));
        assert!(!grant.owns_domain_for("/std/object.rs"));
    }

    #[test]
    fn subject_names_are_lowercased() {
        let grant = PermissionGrant::new("Bob", Level::Player);
        assert_eq!(grant.subject_name, "bob");
    }
}
