// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line framing (§4.3, §6): lines beginning with `NUL [TAG]` are typed
//! control messages carrying a JSON object; every other line is plain game
//! text.

use crate::error::WireError;
use crate::subchannel::Subchannel;
use serde_json::Value;

pub const NUL: u8 = 0x00;

/// One line of the session stream, decoded (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Plain game text, sent to the terminal as-is.
    Text(String),
    /// A `NUL [TAG] {json}` control message on a named subchannel.
    Control { tag: Subchannel, payload: Value },
}

impl Frame {
    pub fn control(tag: Subchannel, payload: Value) -> Self {
        Frame::Control { tag, payload }
    }

    pub fn text(line: impl Into<String>) -> Self {
        Frame::Text(line.into())
    }

    /// Serialize this frame as one line, without a trailing newline (the
    /// caller's writer/codec appends line terminators).
    pub fn encode(&self) -> Result<String, WireError> {
        match self {
            Frame::Text(line) => Ok(line.clone()),
            Frame::Control { tag, payload } => {
                let json = serde_json::to_string(payload)?;
                Ok(format!("{}[{}]{}", NUL as char, tag.as_tag(), json))
            }
        }
    }

    /// Parse one line of input (§4.3). A line is a control frame only if its
    /// first byte is `NUL`; anything else, including a line that merely
    /// contains a stray `NUL` further in, is plain text.
    pub fn decode(line: &str) -> Result<Frame, WireError> {
        let Some(rest) = line.strip_prefix(NUL as char) else {
            return Ok(Frame::Text(line.to_string()));
        };
        let Some(tag_end) = rest.find(']') else {
            return Err(WireError::UnterminatedTag);
        };
        let Some(tag_str) = rest[..tag_end].strip_prefix('[') else {
            return Err(WireError::UnterminatedTag);
        };
        let tag: Subchannel = tag_str.parse().map_err(|_| WireError::UnknownTag(tag_str.to_string()))?;
        let payload: Value = serde_json::from_str(&rest[tag_end + 1..])?;
        Ok(Frame::Control { tag, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_lines_decode_as_text() {
        assert_eq!(Frame::decode("You see a room.").unwrap(), Frame::Text("You see a room.".into()));
    }

    #[test]
    fn control_frame_round_trips() {
        let frame = Frame::control(Subchannel::Time, json!({"epoch_ms": 12345}));
        let encoded = frame.encode().unwrap();
        assert!(encoded.starts_with('\u{0}'));
        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let line = format!("{}[NOT_A_TAG]{{}}", NUL as char);
        assert!(matches!(Frame::decode(&line), Err(WireError::UnknownTag(_))));
    }

    #[test]
    fn unterminated_tag_is_rejected() {
        let line = format!("{}[TIME{{}}", NUL as char);
        assert!(matches!(Frame::decode(&line), Err(WireError::UnterminatedTag)));
    }

    #[test]
    fn invalid_json_payload_is_rejected() {
        let line = format!("{}[TIME]not json", NUL as char);
        assert!(matches!(Frame::decode(&line), Err(WireError::InvalidJson(_))));
    }

    #[test]
    fn auth_req_carries_login_fields() {
        let payload = json!({"type": "login", "name": "Bob", "password": "hunter2"});
        let frame = Frame::control(Subchannel::AuthReq, payload.clone());
        let encoded = frame.encode().unwrap();
        match Frame::decode(&encoded).unwrap() {
            Frame::Control { tag, payload: decoded } => {
                assert_eq!(tag, Subchannel::AuthReq);
                assert_eq!(decoded, payload);
            }
            Frame::Text(_) => panic!("expected a control frame"),
        }
    }
}
