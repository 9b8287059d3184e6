// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tab-completion for the `COMPLETE` subchannel (§4.3, §6): a
//! file-system-aware completer rooted at the mudlib tree, directories
//! suffixed with `/`.
//!
//! The listing itself is pure and unit-tested directly against a temp
//! directory; permission gating (every read is audited, §4.8) and
//! resolving the caller's subject name happen at the call site in
//! `orchestrator.rs`, the same split `candidates()`/caller-does-the-I/O-
//! context shape as `mud-content`'s `watcher` module.

use std::path::{Path, PathBuf};

/// Split a partially typed path into the directory to list and the prefix
/// to filter its entries by, e.g. `/domain/sta` -> (`/domain`, `sta`).
fn split(requested: &str) -> (&str, &str) {
    match requested.rfind('/') {
        Some(index) => (&requested[..index], &requested[index + 1..]),
        None => ("", requested),
    }
}

fn resolve_dir(mudlib_path: &Path, dir: &str) -> PathBuf {
    mudlib_path.join(dir.trim_start_matches('/'))
}

/// Every mudlib-relative entry under `requested`'s directory whose name
/// starts with its typed prefix, sorted, directories suffixed with `/`. An
/// unreadable or nonexistent directory yields no candidates rather than an
/// error (§6 "Tab-completion").
pub fn candidates(mudlib_path: &Path, requested: &str) -> Vec<String> {
    let (dir, prefix) = split(requested);
    let fs_dir = resolve_dir(mudlib_path, dir);
    let Ok(entries) = std::fs::read_dir(&fs_dir) else { return Vec::new() };

    let mut results: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) {
                return None;
            }
            let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
            let mut candidate = if dir.is_empty() { format!("/{name}") } else { format!("{dir}/{name}") };
            if is_dir {
                candidate.push('/');
            }
            Some(candidate)
        })
        .collect();
    results.sort();
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("domain/start")).unwrap();
        std::fs::write(root.path().join("domain/start.mud"), "{}").unwrap();
        std::fs::write(root.path().join("domain/staging.mud"), "{}").unwrap();
        std::fs::write(root.path().join("domain/other.mud"), "{}").unwrap();
        root
    }

    #[test]
    fn lists_entries_matching_the_typed_prefix() {
        let root = layout();
        let mut found = candidates(root.path(), "/domain/sta");
        found.sort();
        assert_eq!(found, vec!["/domain/start.mud".to_string(), "/domain/start/".to_string(), "/domain/staging.mud".to_string()]);
    }

    #[test]
    fn directories_are_suffixed_with_a_slash() {
        let root = layout();
        let found = candidates(root.path(), "/domain/start");
        assert!(found.contains(&"/domain/start/".to_string()));
        assert!(!found.contains(&"/domain/start".to_string()));
    }

    #[test]
    fn root_listing_uses_an_empty_directory_prefix() {
        let root = layout();
        let found = candidates(root.path(), "dom");
        assert_eq!(found, vec!["/domain/".to_string()]);
    }

    #[test]
    fn nonexistent_directory_yields_no_candidates() {
        let root = layout();
        assert!(candidates(root.path(), "/nowhere/x").is_empty());
    }
}
