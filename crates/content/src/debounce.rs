// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coalescing rapid successive writes to the same path into one reload
//! (§4.7 step 6, default 100 ms window).

use indexmap::IndexMap;
use mud_core::{Clock, ContentPath};

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Tracks the soonest moment each changed path becomes eligible to reload.
/// Every new write to the same path pushes its due time back out, so a
/// burst of writes coalesces to a single reload driven by the final write.
pub struct Debouncer<C: Clock> {
    clock: C,
    window_ms: u64,
    pending: IndexMap<ContentPath, u64>,
}

impl<C: Clock> Debouncer<C> {
    pub fn new(clock: C) -> Self {
        Self::with_window_ms(clock, DEFAULT_DEBOUNCE_MS)
    }

    pub fn with_window_ms(clock: C, window_ms: u64) -> Self {
        Self { clock, window_ms, pending: IndexMap::new() }
    }

    /// Record a write to `path`, resetting its debounce window.
    pub fn record(&mut self, path: ContentPath) {
        let due_at_ms = self.clock.epoch_ms() + self.window_ms;
        self.pending.insert(path, due_at_ms);
    }

    /// Paths whose debounce window has elapsed, removed from the pending
    /// set and returned in the order they became due.
    pub fn drain_ready(&mut self) -> Vec<ContentPath> {
        let now_ms = self.clock.epoch_ms();
        let ready: Vec<ContentPath> =
            self.pending.iter().filter(|(_, due_at_ms)| **due_at_ms <= now_ms).map(|(path, _)| path.clone()).collect();
        for path in &ready {
            self.pending.shift_remove(path);
        }
        ready
    }

    pub fn is_pending(&self, path: &ContentPath) -> bool {
        self.pending.contains_key(path)
    }
}
