// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe CSG
//!
//! Mesh boolean evaluation for brush-based parametric editors. Two triangle
//! meshes ("brushes") with world transforms go in; union, subtraction,
//! intersection and their variants come out as fresh attribute buffers with
//! interpolated normals, uvs, tangents and material groups.
//!
//! ```no_run
//! use nalgebra::{Matrix4, Vector3};
//! use polyframe_csg::{BooleanOp, Brush, Evaluator, Primitive};
//!
//! # fn main() -> polyframe_csg::Result<()> {
//! let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
//! let mut b = Brush::new(Primitive::sphere(0.6, 32).to_buffer())?
//!     .with_transform(Matrix4::new_translation(&Vector3::new(0.5, 0.0, 0.0)));
//!
//! let mut evaluator = Evaluator::default();
//! let result = evaluator.evaluate(&mut a, &mut b, BooleanOp::Subtract)?;
//! println!("{} triangles", result.triangle_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod utils;

pub use config::{BvhConfig, CsgConfig, Tolerances};
pub use error::{CsgError, Result};
pub use geometry::{
    analyze, evaluate_batch, prepare_all, AttributeArray, AttributeName, AttributeSchema, BatchJob,
    BooleanOp, BoundingBox, Brush, Evaluator, GeometryBuffer, GeometryStats, GroupRange, Primitive,
};

/// Evaluate one boolean operation with default settings
pub fn evaluate(a: &mut Brush, b: &mut Brush, op: BooleanOp) -> Result<GeometryBuffer> {
    Evaluator::default().evaluate(a, b, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix4, Vector3};

    #[test]
    fn test_basic_union() {
        let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer()).unwrap();
        let mut b = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())
            .unwrap()
            .with_transform(Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0)));
        let result = evaluate(&mut a, &mut b, BooleanOp::Union);
        assert!(result.is_ok());
    }
}
