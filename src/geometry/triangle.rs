// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle with a cached supporting plane

use super::robust_predicates::{is_degenerate, triangle_area, Plane};
use super::BoundingBox;
use nalgebra::{Matrix4, Point3, Vector3};

/// Triangle in some brush-local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Point3<f64>,
    pub b: Point3<f64>,
    pub c: Point3<f64>,
    pub plane: Plane,
}

impl Triangle {
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self {
            a,
            b,
            c,
            plane: Plane::from_points(&a, &b, &c),
        }
    }

    pub fn points(&self) -> [Point3<f64>; 3] {
        [self.a, self.b, self.c]
    }

    /// Unit normal (zero when degenerate)
    pub fn normal(&self) -> Vector3<f64> {
        self.plane.normal
    }

    pub fn midpoint(&self) -> Point3<f64> {
        Point3::from((self.a.coords + self.b.coords + self.c.coords) / 3.0)
    }

    pub fn area(&self) -> f64 {
        triangle_area(&self.a, &self.b, &self.c)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&[self.a, self.b, self.c])
    }

    pub fn is_degenerate(&self, edge_epsilon: f64, angle_epsilon: f64) -> bool {
        is_degenerate(&self.a, &self.b, &self.c, edge_epsilon, angle_epsilon)
    }

    /// Apply an affine transform; the plane is recomputed
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Triangle {
        Triangle::new(
            matrix.transform_point(&self.a),
            matrix.transform_point(&self.b),
            matrix.transform_point(&self.c),
        )
    }

    /// Same triangle with opposite winding
    pub fn flipped(&self) -> Triangle {
        Triangle {
            a: self.a,
            b: self.c,
            c: self.b,
            plane: self.plane.flipped(),
        }
    }

    /// Barycentric coordinates of a point projected onto this triangle's plane.
    ///
    /// Degenerate triangles map everything to the first corner.
    pub fn barycentric(&self, point: &Point3<f64>) -> Vector3<f64> {
        let v0 = self.b - self.a;
        let v1 = self.c - self.a;
        let v2 = point - self.a;

        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);

        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f64::EPSILON * d00 * d11 {
            return Vector3::new(1.0, 0.0, 0.0);
        }

        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        Vector3::new(1.0 - v - w, v, w)
    }
}
