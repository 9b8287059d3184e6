// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mud-wire: the session line protocol (C3, §4.3, §6) — `NUL [TAG] {json}`
//! control frames interleaved with plain game text, one per line.

mod codec;
mod error;
mod frame;
mod messages;
mod subchannel;

pub use codec::{FrameCodec, MAX_LINE_LENGTH};
pub use error::WireError;
pub use frame::{Frame, NUL};
pub use messages::{
    AuthErrorCode, AuthRequest, AuthRequestType, AuthResponse, CompleteRequest, CompleteResponse,
    SessionMessage, SessionMessageType, TimeAck, TimePong,
};
pub use subchannel::Subchannel;
