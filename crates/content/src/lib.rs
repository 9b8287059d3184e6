// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Hot-Reload Supervisor (§4.7, C7): compiles content units, swaps
//! blueprints atomically, retargets live clones, and walks the tracked
//! dependency graph to reload dependents.

pub mod compiler;
pub mod debounce;
pub mod dependency;
pub mod error;
pub mod safelist;
pub mod supervisor;
pub mod watcher;

pub use compiler::{CompiledUnit, ContentCompiler};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_MS};
pub use dependency::DependencyGraph;
pub use error::{CompileDiagnostic, ContentError};
pub use safelist::{Safelist, DEFAULT_SAFELIST_PREFIXES};
pub use supervisor::{ContentSupervisor, ReloadBatchReport, ReloadOutcome};
pub use watcher::{spawn_watcher, FsChange};
