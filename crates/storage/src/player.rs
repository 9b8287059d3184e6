// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Player save records (§6 "Persisted state layout").
//!
//! The persistence file format itself is an external collaborator (spec
//! Non-goals); the driver only owns the required top-level shape
//! `{name, location, state:{properties}, inventory?, savedAt}` and the
//! interfaces that read and write it.

use crate::password::StoredPassword;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `state` wrapper named by §6's shape: entity properties live under a
/// `properties` key, not at `state`'s own top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// `{name, location, state:{properties}, inventory?, savedAt}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub location: String,
    pub state: PlayerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<String>>,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
    pub password: StoredPassword,
    /// `true` for the first-ever registered player (§4.4 "granted
    /// Administrator").
    #[serde(default)]
    pub is_administrator: bool,
}

impl PlayerRecord {
    pub fn new_registration(name: String, location: String, password: StoredPassword, saved_at: DateTime<Utc>) -> Self {
        Self {
            name,
            location,
            state: PlayerState::default(),
            inventory: None,
            saved_at,
            password,
            is_administrator: false,
        }
    }
}
