// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed persistence for player records and arbitrary data namespaces
//! (§6). Writes are atomic: serialize to a sibling `.tmp` file, then
//! `rename` over the destination, the same write-then-rename discipline
//! `oj-daemon`'s snapshot persistence uses for crash safety.

use crate::error::StorageError;
use crate::player::PlayerRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Player names: `[A-Za-z]{3,16}` (§4.4).
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (3..=16).contains(&len) && name.chars().all(|c| c.is_ascii_alphabetic())
}

/// Case-normalize a player name to Title-case for storage (§4.4).
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Owns the data root and provides player/namespace persistence (§6).
pub struct PlayerStore {
    data_root: PathBuf,
}

impl PlayerStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into() }
    }

    fn players_dir(&self) -> PathBuf {
        self.data_root.join("players")
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.data_root.join("data").join(namespace)
    }

    fn player_path(&self, name: &str) -> PathBuf {
        self.players_dir().join(format!("{}.json", normalize_name(name)))
    }

    pub fn player_exists(&self, name: &str) -> bool {
        self.player_path(name).is_file()
    }

    /// Number of registered players, used to decide whether a fresh
    /// registration is the first-ever and should be granted Administrator
    /// (§4.4).
    pub fn player_count(&self) -> Result<usize, StorageError> {
        let dir = self.players_dir();
        if !dir.is_dir() {
            return Ok(0);
        }
        let count = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("json"))
            .count();
        Ok(count)
    }

    pub fn load_player(&self, name: &str) -> Result<PlayerRecord, StorageError> {
        let path = self.player_path(name);
        let bytes = fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::PlayerNotFound(name.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save_player(&self, record: &PlayerRecord) -> Result<(), StorageError> {
        let dir = self.players_dir();
        fs::create_dir_all(&dir)?;
        write_atomic(&self.player_path(&record.name), &serde_json::to_vec_pretty(record)?)
    }

    /// Read a namespaced data blob, e.g. guild rosters or quest-board state
    /// owned by content, not by a specific player (§6).
    pub fn read_data(&self, namespace: &str, key: &str) -> Result<serde_json::Value, StorageError> {
        let path = self.namespace_dir(namespace).join(format!("{key}.json"));
        let bytes = fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::KeyNotFound { namespace: namespace.to_string(), key: key.to_string() }
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write_data(&self, namespace: &str, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)?;
        write_atomic(&dir.join(format!("{key}.json")), &serde_json::to_vec_pretty(value)?)
    }

    /// Every key currently stored under `namespace`, for `list_data_keys`
    /// (§4.10).
    pub fn list_data_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.namespace_dir(namespace);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys: Vec<String> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Remove a namespaced data blob; missing keys are not an error
    /// (`delete_data`, §4.10).
    pub fn delete_data(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let path = self.namespace_dir(namespace).join(format!("{key}.json"));
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Every registered player's name, for `list_players` (§4.10).
    pub fn list_players(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.players_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::StoredPassword;
    use chrono::Utc;

    #[test]
    fn valid_names_match_the_length_and_alpha_rule() {
        assert!(is_valid_name("Bob"));
        assert!(is_valid_name("abcdefghijklmnop"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("abcdefghijklmnopq"));
        assert!(!is_valid_name("bob1"));
    }

    #[test]
    fn names_are_normalized_to_title_case() {
        assert_eq!(normalize_name("BOB"), "Bob");
        assert_eq!(normalize_name("alice"), "Alice");
    }

    #[test]
    fn save_then_load_round_trips_the_required_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let password = StoredPassword::hash("hunter2x").unwrap();
        let record = PlayerRecord::new_registration("bob".into(), "/domain/start".into(), password, Utc::now());
        store.save_player(&record).unwrap();

        assert!(store.player_exists("BOB"));
        let loaded = store.load_player("Bob").unwrap();
        assert_eq!(loaded.location, "/domain/start");
    }

    #[test]
    fn loading_an_unknown_player_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        assert!(matches!(store.load_player("Ghost"), Err(StorageError::PlayerNotFound(_))));
    }

    #[test]
    fn first_registered_player_count_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        assert_eq!(store.player_count().unwrap(), 0);
    }

    #[test]
    fn namespaced_data_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let value = serde_json::json!({"members": ["Bob", "Alice"]});
        store.write_data("guilds", "warriors", &value).unwrap();
        assert_eq!(store.read_data("guilds", "warriors").unwrap(), value);
    }

    #[test]
    fn list_data_keys_is_sorted_and_empty_for_unknown_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        assert!(store.list_data_keys("guilds").unwrap().is_empty());
        store.write_data("guilds", "warriors", &serde_json::json!({})).unwrap();
        store.write_data("guilds", "archers", &serde_json::json!({})).unwrap();
        assert_eq!(store.list_data_keys("guilds").unwrap(), vec!["archers", "warriors"]);
    }

    #[test]
    fn delete_data_removes_a_key_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        store.write_data("guilds", "warriors", &serde_json::json!({})).unwrap();
        store.delete_data("guilds", "warriors").unwrap();
        assert!(matches!(store.read_data("guilds", "warriors"), Err(StorageError::KeyNotFound { .. })));
        store.delete_data("guilds", "warriors").unwrap();
    }

    #[test]
    fn list_players_is_sorted_by_normalized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let password = StoredPassword::hash("hunter2x").unwrap();
        store.save_player(&PlayerRecord::new_registration("bob".into(), "/domain/start".into(), password.clone(), Utc::now())).unwrap();
        store.save_player(&PlayerRecord::new_registration("alice".into(), "/domain/start".into(), password, Utc::now())).unwrap();
        assert_eq!(store.list_players().unwrap(), vec!["Alice", "Bob"]);
    }
}
