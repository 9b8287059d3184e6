// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (§6).

use crate::error::DaemonError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_ISOLATE_MEMORY_MB: u64 = 64;
pub const DEFAULT_TCP_PORT: u16 = 4242;
pub const DEFAULT_START_ROOM: &str = "/domain/start";

/// Resolved startup configuration, read once from the environment (§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub mudlib_path: PathBuf,
    pub master_object: String,
    pub heartbeat_interval_ms: u64,
    pub hot_reload: bool,
    pub isolate_memory_mb: u64,
    pub log_level: String,
    pub log_pretty: bool,
    pub tcp_port: u16,
    pub start_room: String,
}

impl Config {
    /// Load configuration from the environment, applying the documented
    /// defensible defaults (§6). Fails with [`DaemonError::Config`] only
    /// when a set variable cannot be parsed as its expected type.
    pub fn load() -> Result<Self, DaemonError> {
        Ok(Self {
            mudlib_path: mudlib_path()?,
            master_object: master_object(),
            heartbeat_interval_ms: heartbeat_interval_ms()?,
            hot_reload: hot_reload(),
            isolate_memory_mb: isolate_memory_mb()?,
            log_level: log_level(),
            log_pretty: log_pretty(),
            tcp_port: tcp_port()?,
            start_room: start_room(),
        })
    }
}

fn mudlib_path() -> Result<PathBuf, DaemonError> {
    match std::env::var("MUDLIB_PATH") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        Ok(_) => Err(DaemonError::Config("MUDLIB_PATH must not be empty".into())),
        Err(std::env::VarError::NotPresent) => Ok(PathBuf::from("./mudlib")),
        Err(err) => Err(DaemonError::Config(format!("MUDLIB_PATH: {err}"))),
    }
}

fn master_object() -> String {
    std::env::var("MASTER_OBJECT").unwrap_or_else(|_| "/master".to_string())
}

fn heartbeat_interval_ms() -> Result<u64, DaemonError> {
    parse_env_or("HEARTBEAT_INTERVAL_MS", DEFAULT_HEARTBEAT_INTERVAL_MS)
}

fn hot_reload() -> bool {
    std::env::var("HOT_RELOAD").map(|v| v != "0" && !v.eq_ignore_ascii_case("false")).unwrap_or(true)
}

fn isolate_memory_mb() -> Result<u64, DaemonError> {
    parse_env_or("ISOLATE_MEMORY_MB", DEFAULT_ISOLATE_MEMORY_MB)
}

fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

fn log_pretty() -> bool {
    std::env::var("LOG_PRETTY").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn tcp_port() -> Result<u16, DaemonError> {
    parse_env_or("MUD_TCP_PORT", DEFAULT_TCP_PORT)
}

fn start_room() -> String {
    std::env::var("MUD_START_ROOM").unwrap_or_else(|_| DEFAULT_START_ROOM.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, DaemonError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|_| DaemonError::Config(format!("{key} must be a number, got {value:?}"))),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(DaemonError::Config(format!("{key}: {err}"))),
    }
}

/// Bounded reconnect window before a disconnected player entity's
/// disconnect-timeout task fires (§4.3, §4.4, §5 "default 15 minutes,
/// configurable").
pub fn disconnect_timeout() -> Duration {
    std::env::var("MUD_DISCONNECT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(15 * 60))
}

/// Debounce window for the save trigger (§4.5 step 6): commands that flag
/// themselves as mutating persistent state coalesce into one save per
/// window rather than one save per command.
pub fn save_debounce() -> Duration {
    std::env::var("MUD_SAVE_DEBOUNCE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(2_000))
}

/// TTL for issued session-resume tokens (§4.4).
pub fn session_token_ttl() -> Duration {
    std::env::var("MUD_SESSION_TOKEN_TTL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(900))
}
