// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for boolean evaluation

use thiserror::Error;

/// Errors raised by the CSG engine.
///
/// Only programmer errors surface here. Degenerate fragments, ambiguous
/// classifications and non-manifold input are handled inside the pipeline.
#[derive(Error, Debug)]
pub enum CsgError {
    /// The two operands do not carry the same attribute set.
    #[error("Attribute mismatch between operands: expected [{expected}], found [{found}]")]
    InputMismatch {
        /// Schema of the first operand.
        expected: String,
        /// Schema of the second operand.
        found: String,
    },

    /// An operation name that does not map to a boolean operation.
    #[error("Invalid boolean operation: {0}")]
    InvalidOperation(String),

    /// The geometry buffer has no usable position attribute.
    #[error("Geometry has no position attribute with item size 3")]
    MissingPosition,

    /// A buffer attribute or index is malformed.
    #[error("Invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name (or "index").
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The read-only evaluation path was given a brush with stale caches.
    #[error("Brush caches are missing or stale; call prepare() first")]
    BrushNotPrepared,

    /// I/O error while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CsgError>;
