// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - attribute buffers, brushes and boolean evaluation

pub mod analytics;
pub mod assembler;
mod bbox;
pub mod boolean;
pub mod brush;
mod buffer;
pub mod bvh;
pub mod classification;
pub mod csg;
pub mod halfedge;
pub mod intersection;
pub mod parallel_boolean;
mod primitives;
pub mod robust_predicates;
pub mod triangle;
pub mod triangle_intersection;
pub mod triangle_splitting;

pub use analytics::{analyze, analyze_with, GeometryStats};
pub use bbox::BoundingBox;
pub use boolean::{decide, Action, BooleanOp};
pub use brush::{Brush, BrushCache};
pub use buffer::{
    AttributeArray, AttributeName, AttributeSchema, GeometryBuffer, GroupRange, NamedAttribute,
};
pub use classification::Side;
pub use csg::Evaluator;
pub use parallel_boolean::{evaluate_batch, prepare_all, BatchJob};
pub use primitives::Primitive;
pub use triangle::Triangle;
