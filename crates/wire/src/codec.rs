// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `tokio_util::codec` adapter framing a byte stream into [`Frame`]s
//! (§4.3), one per line.

use crate::error::WireError;
use crate::frame::Frame;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Maximum line length before a session is considered to be sending
/// malformed or abusive input (§7 "Protocol error: frame dropped").
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Splits a byte stream on line boundaries and decodes/encodes each line as
/// a [`Frame`] (§4.3, §6).
pub struct FrameCodec {
    lines: LinesCodec,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self { lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH) }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(line) = self.lines.decode(src).map_err(map_lines_error)? else {
            return Ok(None);
        };
        Frame::decode(&line).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.encode()?;
        self.lines.encode(line, dst).map_err(map_lines_error)
    }
}

fn map_lines_error(err: LinesCodecError) -> WireError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => WireError::FrameTooLong,
        LinesCodecError::Io(io) => WireError::Io(io),
    }
}
