// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated driver error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load the master object from {0}")]
    MasterLoadFailed(String),

    #[error(transparent)]
    Registry(#[from] mud_registry::RegistryError),

    #[error(transparent)]
    Scheduler(#[from] mud_scheduler::SchedulerError),

    #[error(transparent)]
    Permission(#[from] mud_permissions::PermissionError),

    #[error(transparent)]
    Wire(#[from] mud_wire::WireError),

    #[error(transparent)]
    Storage(#[from] mud_storage::StorageError),

    #[error(transparent)]
    Content(#[from] mud_content::ContentError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Process exit codes (§6): 0 clean, 1 configuration error, 2 failed to
/// load the master object.
impl DaemonError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Config(_) => 1,
            DaemonError::MasterLoadFailed(_) => 2,
            _ => 1,
        }
    }
}
