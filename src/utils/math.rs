// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Unnormalized geometric normal of a triangle (length is twice its area)
pub fn triangle_cross(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    (p1 - p0).cross(&(p2 - p0))
}

/// Unit geometric normal of a triangle, zero for degenerate input
pub fn triangle_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    triangle_cross(p0, p1, p2)
        .try_normalize(f64::MIN_POSITIVE)
        .unwrap_or_else(Vector3::zeros)
}

/// Upper-left 3x3 block of an affine transform
pub fn linear_part(matrix: &Matrix4<f64>) -> Matrix3<f64> {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Inverse transpose of the linear part, used to carry normals.
///
/// Singular transforms fall back to the linear part itself.
pub fn normal_matrix(matrix: &Matrix4<f64>) -> Matrix3<f64> {
    let linear = linear_part(matrix);
    linear
        .try_inverse()
        .map(|m| m.transpose())
        .unwrap_or(linear)
}

/// Whether a transform flips orientation
pub fn is_mirroring(matrix: &Matrix4<f64>) -> bool {
    linear_part(matrix).determinant() < 0.0
}

/// Inverse of an affine transform, identity when singular
pub fn inverse_or_identity(matrix: &Matrix4<f64>) -> Matrix4<f64> {
    matrix.try_inverse().unwrap_or_else(Matrix4::identity)
}
