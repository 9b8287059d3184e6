// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("data key not found: {namespace}/{key}")]
    KeyNotFound { namespace: String, key: String },

    #[error("invalid name: {0}")]
    InvalidName(String),
}
