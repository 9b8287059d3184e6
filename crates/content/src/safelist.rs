// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paths requiring explicit operator confirmation rather than auto-reload
//! (§4.7 "Safelist").

use mud_core::ContentPath;

/// Default safelisted prefixes: the player base, the master object, and the
/// login daemon (§4.7).
pub const DEFAULT_SAFELIST_PREFIXES: &[&str] = &["/std/player", "/master.", "/secure/login"];

#[derive(Debug, Clone)]
pub struct Safelist {
    prefixes: Vec<String>,
}

impl Safelist {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self { prefixes: prefixes.into_iter().collect() }
    }

    pub fn requires_confirmation(&self, path: &ContentPath) -> bool {
        self.prefixes.iter().any(|prefix| path.as_str().starts_with(prefix.as_str()))
    }
}

impl Default for Safelist {
    fn default() -> Self {
        Self::new(DEFAULT_SAFELIST_PREFIXES.iter().map(|s| s.to_string()))
    }
}
