// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors specific to the Object and Shadow registries (§4.1, §4.6).

use mud_core::{ContentPath, ObjectId, ShadowType};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("blueprint already registered: {0}")]
    DuplicateBlueprint(ContentPath),

    #[error("unknown blueprint: {0}")]
    UnknownBlueprint(ContentPath),

    #[error("entity not found: {0}")]
    NotFound(ObjectId),

    #[error("blueprints cannot be placed into an environment: {0}")]
    BlueprintCannotBeContained(ObjectId),

    #[error("shadow {shadow_type} already attached to {target}")]
    DuplicateShadow { target: ObjectId, shadow_type: ShadowType },

    #[error("shadow {shadow_type} not attached to {target}")]
    UnknownShadow { target: ObjectId, shadow_type: ShadowType },
}
