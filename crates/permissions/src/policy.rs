// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The permissions policy engine (§4.8, C8).

use crate::audit::{Action, AuditEntry, AuditLog};
use chrono::Utc;
use mud_core::{normalize_subject, Level, PermissionGrant};
use std::collections::HashMap;

/// Process-wide protected prefixes content may never write under, even with
/// an encompassing domain grant (§4.8).
pub const PROTECTED_PREFIXES: &[&str] = &["/std/", "/core/", "/daemon/", "/master.", "/simul_efun."];

/// The shared-library root a SeniorBuilder may write under regardless of
/// domain ownership (§4.8).
pub const SHARED_LIBRARY_ROOT: &str = "/lib/";

fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Holds every subject's [`PermissionGrant`] and the audit log of checks
/// made against them (§4.8).
pub struct PermissionPolicy {
    grants: HashMap<String, PermissionGrant>,
    audit: AuditLog,
}

impl PermissionPolicy {
    pub fn new() -> Self {
        Self { grants: HashMap::new(), audit: AuditLog::default() }
    }

    pub fn with_audit_capacity(capacity: usize) -> Self {
        Self { grants: HashMap::new(), audit: AuditLog::new(capacity) }
    }

    /// Record or replace a subject's grant (§4.8 "grant"/"revoke" actions are
    /// audited by the caller, which calls this after deciding to apply one).
    pub fn grant(&mut self, grant: PermissionGrant) {
        self.grants.insert(grant.subject_name.clone(), grant);
    }

    pub fn revoke(&mut self, subject: &str) {
        self.grants.remove(&normalize_subject(subject));
    }

    pub fn grant_for(&self, subject: &str) -> Option<&PermissionGrant> {
        self.grants.get(&normalize_subject(subject))
    }

    /// Every currently held grant, for snapshotting to storage
    /// (`save_permissions`, §4.10).
    pub fn grants(&self) -> impl Iterator<Item = &PermissionGrant> {
        self.grants.values()
    }

    /// The effective level for `subject` (`None` is the internal driver
    /// identity, always Administrator, §4.8).
    pub fn level_of(&self, subject: Option<&str>) -> Level {
        match subject {
            // Null subject (internal driver actions) is implicitly Administrator (§4.8).
            None => Level::Administrator,
            Some(name) => self.grant_for(name).map(|g| g.level).unwrap_or(Level::Player),
        }
    }

    /// Reads are unconditional for any non-secret path (§4.8); this driver
    /// does not model a "secret path" flag, so every read is allowed, and
    /// the check is still audited.
    pub fn check_read(&mut self, subject: Option<&str>, target: &str) -> bool {
        self.audit(subject, Action::Read, target, true);
        true
    }

    /// The write policy of §4.8, evaluated and audited.
    pub fn check_write(&mut self, subject: Option<&str>, target: &str) -> bool {
        let level = self.level_of(subject);
        let allowed = if level == Level::Administrator {
            true
        } else if is_protected(target) {
            false
        } else if level == Level::SeniorBuilder && target.starts_with(SHARED_LIBRARY_ROOT) {
            true
        } else if level == Level::Builder || level == Level::SeniorBuilder {
            subject
                .and_then(|s| self.grant_for(s))
                .map(|grant| grant.owns_domain_for(target))
                .unwrap_or(false)
        } else {
            false
        };
        self.audit(subject, Action::Write, target, allowed);
        allowed
    }

    pub fn record_grant(&mut self, actor: Option<&str>, subject: &str) {
        self.audit(actor, Action::Grant, subject, true);
    }

    pub fn record_revoke(&mut self, actor: Option<&str>, subject: &str) {
        self.audit(actor, Action::Revoke, subject, true);
    }

    fn audit(&mut self, subject: Option<&str>, action: Action, target: &str, success: bool) {
        self.audit.record(AuditEntry {
            timestamp: Utc::now(),
            subject: subject.map(normalize_subject).unwrap_or_else(|| "<driver>".into()),
            action,
            target: target.to_string(),
            success,
        });
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_subject_is_administrator_and_bypasses_protected_prefixes() {
        let mut policy = PermissionPolicy::new();
        assert!(policy.check_write(None, "/std/object.c"));
    }

    #[test]
    fn builder_cannot_write_protected_prefix_even_with_encompassing_domain() {
        let mut policy = PermissionPolicy::new();
        policy.grant(PermissionGrant::new("bob", Level::Builder).with_domain("/"));
        assert!(!policy.check_write(Some("bob"), "/std/object.c"));
    }

    #[test]
    fn builder_can_write_within_owned_domain() {
        let mut policy = PermissionPolicy::new();
        policy.grant(PermissionGrant::new("bob", Level::Builder).with_domain("/areas/castle/"));
        assert!(policy.check_write(Some("bob"), "/areas/castle/room.rs"));
        assert!(!policy.check_write(Some("bob"), "/areas/dungeon/room.rs"));
    }

    #[test]
    fn senior_builder_can_write_shared_library_root_without_a_domain_grant() {
        let mut policy = PermissionPolicy::new();
        policy.grant(PermissionGrant::new("carol", Level::SeniorBuilder));
        assert!(policy.check_write(Some("carol"), "/lib/helpers.rs"));
        assert!(!policy.check_write(Some("carol"), "/areas/castle/room.rs"));
    }

    #[test]
    fn player_level_cannot_write_anywhere() {
        let mut policy = PermissionPolicy::new();
        assert!(!policy.check_write(Some("anon"), "/areas/castle/room.rs"));
    }

    #[test]
    fn subject_names_are_case_normalized_for_grant_lookup() {
        let mut policy = PermissionPolicy::new();
        policy.grant(PermissionGrant::new("Bob", Level::Administrator));
        assert!(policy.check_write(Some("BOB"), "/std/object.c"));
    }

    #[test]
    fn every_check_is_audited() {
        let mut policy = PermissionPolicy::new();
        policy.check_read(Some("bob"), "/areas/castle/room.rs");
        policy.check_write(Some("bob"), "/std/object.c");
        assert_eq!(policy.audit_log().len(), 2);
    }
}
