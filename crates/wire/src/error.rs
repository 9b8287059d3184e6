// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// A malformed frame (§4.3, §7 "Protocol"): the frame is dropped and a
/// counter incremented, not fatal to the session.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unrecognized subchannel tag: {0}")]
    UnknownTag(String),

    #[error("malformed control frame: missing closing bracket")]
    UnterminatedTag,

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("line exceeds maximum frame length")]
    FrameTooLong,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
