// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mud_core::ContentPath;
use thiserror::Error;

/// A compile diagnostic surfaced to a watching builder (§4.7 step 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl CompileDiagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("compile failed for {path}: {diagnostic}")]
    CompileFailed { path: ContentPath, diagnostic: CompileDiagnostic },

    #[error("{0} requires explicit operator confirmation before reload")]
    Safelisted(ContentPath),

    #[error("no content unit registered at {0}")]
    UnknownUnit(ContentPath),

    #[error("registry error: {0}")]
    Registry(#[from] mud_registry::RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl std::fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}
