// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The normative subchannel tag set (§4.3, §6).

use std::fmt;
use std::str::FromStr;

/// A recognized `NUL [TAG]` control subchannel (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subchannel {
    Ide,
    Map,
    Stats,
    Gui,
    Quest,
    Complete,
    Comm,
    Auth,
    AuthReq,
    Combat,
    Sound,
    Giphy,
    Session,
    Time,
    TimeAck,
    TimePong,
    Visibility,
}

impl Subchannel {
    pub const ALL: &'static [Subchannel] = &[
        Subchannel::Ide,
        Subchannel::Map,
        Subchannel::Stats,
        Subchannel::Gui,
        Subchannel::Quest,
        Subchannel::Complete,
        Subchannel::Comm,
        Subchannel::Auth,
        Subchannel::AuthReq,
        Subchannel::Combat,
        Subchannel::Sound,
        Subchannel::Giphy,
        Subchannel::Session,
        Subchannel::Time,
        Subchannel::TimeAck,
        Subchannel::TimePong,
        Subchannel::Visibility,
    ];

    pub fn as_tag(self) -> &'static str {
        match self {
            Subchannel::Ide => "IDE",
            Subchannel::Map => "MAP",
            Subchannel::Stats => "STATS",
            Subchannel::Gui => "GUI",
            Subchannel::Quest => "QUEST",
            Subchannel::Complete => "COMPLETE",
            Subchannel::Comm => "COMM",
            Subchannel::Auth => "AUTH",
            Subchannel::AuthReq => "AUTH_REQ",
            Subchannel::Combat => "COMBAT",
            Subchannel::Sound => "SOUND",
            Subchannel::Giphy => "GIPHY",
            Subchannel::Session => "SESSION",
            Subchannel::Time => "TIME",
            Subchannel::TimeAck => "TIME_ACK",
            Subchannel::TimePong => "TIME_PONG",
            Subchannel::Visibility => "VISIBILITY",
        }
    }

    /// Subchannels that backpressure may discard before a sending queue's
    /// discardable high-water mark is hit (§4.3 "non-authoritative
    /// subchannels"). `SESSION`, `AUTH`, and `AUTH_REQ` carry state the
    /// client cannot recover without a full reconnect, so they're kept.
    pub fn is_discardable(self) -> bool {
        !matches!(self, Subchannel::Session | Subchannel::Auth | Subchannel::AuthReq)
    }
}

impl fmt::Display for Subchannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Subchannel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subchannel::ALL.iter().copied().find(|tag| tag.as_tag() == s).ok_or(())
    }
}
