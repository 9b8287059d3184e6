// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payloads for the subchannels the driver itself interprets (§4.4,
//! §6). Everything else (`MAP`, `IDE`, `STATS`, `GUI`, ...) stays an opaque
//! `serde_json::Value` per §6 ("payload opaque to the core").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequestType {
    Login,
    Register,
}

/// `AUTH_REQ` (c→s): structured login/registration (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "type")]
    pub kind: AuthRequestType,
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    InvalidCredentials,
    UserNotFound,
    NameTaken,
    ValidationError,
}

/// `AUTH` (s→c): the reply to an [`AuthRequest`] (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<AuthErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_registration: Option<bool>,
}

impl AuthResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None, error_code: None, requires_registration: None }
    }

    pub fn failure(error_code: AuthErrorCode, error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), error_code: Some(error_code), requires_registration: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMessageType {
    SessionToken,
    SessionResume,
    SessionInvalid,
}

/// `SESSION` (s→c): token issuance and resume outcomes (§4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    #[serde(rename = "type")]
    pub kind: SessionMessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "expiresAt")]
    pub expires_at: Option<u64>,
}

impl SessionMessage {
    pub fn token(token: impl Into<String>, expires_at: u64) -> Self {
        Self { kind: SessionMessageType::SessionToken, token: Some(token.into()), expires_at: Some(expires_at) }
    }

    pub fn invalid() -> Self {
        Self { kind: SessionMessageType::SessionInvalid, token: None, expires_at: None }
    }
}

/// `COMPLETE` (c→s): a tab-completion request for the given partially typed
/// path (§4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub path: String,
}

/// `COMPLETE` (s→c): candidate completions for a [`CompleteRequest`],
/// directories suffixed with `/` (§6 "Tab-completion").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub candidates: Vec<String>,
}

/// `TIME_ACK` (c→s): echoes the client's own clock for RTT measurement
/// (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeAck {
    #[serde(rename = "clientTimeMs")]
    pub client_time_ms: u64,
}

/// `TIME_PONG` (s→c): the server's reply, echoing the client timestamp back
/// (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePong {
    #[serde(rename = "clientTimeMs")]
    pub client_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_request_round_trips_through_json() {
        let payload = serde_json::json!({
            "type": "login",
            "name": "Bob",
            "password": "hunter2",
        });
        let request: AuthRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.kind, AuthRequestType::Login);
        assert!(request.confirm_password.is_none());
    }

    #[test]
    fn auth_response_failure_carries_error_code() {
        let response = AuthResponse::failure(AuthErrorCode::UserNotFound, "no such player");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error_code"], "user_not_found");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn session_token_message_omits_none_fields() {
        let message = SessionMessage::invalid();
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("token").is_none());
    }

    #[test]
    fn complete_request_round_trips_through_json() {
        let payload = serde_json::json!({ "path": "/domain/sta" });
        let request: CompleteRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.path, "/domain/sta");
    }

    #[test]
    fn complete_response_lists_candidates() {
        let response = CompleteResponse { candidates: vec!["/domain/start/".to_string()] };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["candidates"][0], "/domain/start/");
    }
}
