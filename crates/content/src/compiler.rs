// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between this crate and the world-content library's compiler,
//! itself an external collaborator (spec Non-goals (a)). The supervisor
//! only needs *something* that turns source text into a constructed
//! [`ContentClass`] plus the set of paths it depends on; how that
//! compilation actually happens is out of scope here.

use mud_core::{ContentClass, ContentPath};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::CompileDiagnostic;

/// The product of a successful compile (§4.7 step 1).
pub struct CompiledUnit {
    pub class: Arc<dyn ContentClass>,
    /// Source fingerprint, used to skip no-op reloads (§8).
    pub fingerprint: String,
    /// Paths this unit `inherit`s or otherwise depends on (§4.7 step 5).
    pub dependencies: BTreeSet<ContentPath>,
}

/// Compiles content source into a [`CompiledUnit`] (§4.7 step 1).
pub trait ContentCompiler: Send + Sync {
    fn compile(&self, path: &ContentPath, source: &str) -> Result<CompiledUnit, CompileDiagnostic>;
}
