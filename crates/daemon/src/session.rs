// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session outbound buffering and keepalive (§4.3, C3).
//!
//! Accepting sockets and pumping bytes across them is `mud-daemon`'s own
//! I/O loop (see `listener.rs`); this module holds the pure, testable
//! backpressure policy that loop delegates to.

use mud_core::{ObjectId, SessionId, SessionToken};
use mud_wire::Frame;
use std::collections::VecDeque;
use std::time::Duration;

/// Above this many buffered outbound frames, oldest discardable ones are
/// dropped first (§4.3 "configurable high-water mark").
pub const DEFAULT_HIGH_WATER_MARK: usize = 256;

/// Interval between `TIME` keepalive frames (§4.3 "periodically").
pub const TIME_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Scheduler callback name for a debounced player save (§4.5 "Save trigger").
pub const SAVE_DEBOUNCE_CALLBACK: &str = "__save_debounce";

/// Owner of a session: still authenticating, or bound to a live player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOwner {
    LoggingIn,
    Player(ObjectId),
}

fn is_discardable(frame: &Frame) -> bool {
    match frame {
        Frame::Text(_) => false,
        Frame::Control { tag, .. } => tag.is_discardable(),
    }
}

/// Bounded outbound buffer with discardable-first eviction (§4.3).
pub struct OutboundQueue {
    high_water_mark: usize,
    frames: VecDeque<Frame>,
    dropped: u64,
}

impl OutboundQueue {
    pub fn new(high_water_mark: usize) -> Self {
        Self { high_water_mark, frames: VecDeque::new(), dropped: 0 }
    }

    /// Enqueue `frame`; if this pushes the queue over the high-water mark,
    /// evict the oldest discardable frame first. If every buffered frame is
    /// non-discardable (authoritative), the queue is allowed to grow past
    /// the mark rather than drop authoritative content.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
        while self.frames.len() > self.high_water_mark {
            match self.frames.iter().position(is_discardable) {
                Some(index) => {
                    self.frames.remove(index);
                    self.dropped += 1;
                }
                None => break,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER_MARK)
    }
}

/// State held per connected session, independent of the socket itself
/// (§4.3, §4.4 "session-resume token").
pub struct Session {
    pub id: SessionId,
    pub owner: SessionOwner,
    pub outbound: OutboundQueue,
    pub resume_token: Option<SessionToken>,
    pub remote_host: Option<String>,
    /// While a reconnect is in flight, commands submitted by the client are
    /// held here rather than dispatched (§4.3 "message queue for the
    /// client").
    pub held_input: VecDeque<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            owner: SessionOwner::LoggingIn,
            outbound: OutboundQueue::default(),
            resume_token: None,
            remote_host: None,
            held_input: VecDeque::new(),
        }
    }

    pub fn bind_player(&mut self, entity: ObjectId) {
        self.owner = SessionOwner::Player(entity);
    }

    pub fn player(&self) -> Option<&ObjectId> {
        match &self.owner {
            SessionOwner::Player(id) => Some(id),
            SessionOwner::LoggingIn => None,
        }
    }
}
