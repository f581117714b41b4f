// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Epsilon-tolerant geometric predicates shared by the splitter, the
//! intersection collector and the result assembler

use nalgebra::{Point3, Vector3};

/// Oriented plane `normal . p = w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub w: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, w: f64) -> Self {
        Self { normal, w }
    }

    /// Plane through `point` with the given (unit) normal
    pub fn from_normal_and_point(normal: Vector3<f64>, point: &Point3<f64>) -> Self {
        Self {
            normal,
            w: normal.dot(&point.coords),
        }
    }

    /// Plane of a counter-clockwise triangle. Degenerate input yields a zero normal.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Self {
        let normal = crate::utils::math::triangle_normal(a, b, c);
        Self::from_normal_and_point(normal, a)
    }

    /// Signed distance, positive on the side the normal points to
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.w
    }

    pub fn flipped(&self) -> Plane {
        Plane::new(-self.normal, -self.w)
    }
}

/// Side of a plane a point lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneClassification {
    Front,
    Back,
    OnPlane,
}

impl PlaneClassification {
    /// Bit used when OR-ing vertex classes into a triangle class
    pub fn bit(self) -> u8 {
        match self {
            PlaneClassification::OnPlane => 0,
            PlaneClassification::Front => 1,
            PlaneClassification::Back => 2,
        }
    }
}

/// Classify a signed distance against a tolerance
pub fn classify_distance(distance: f64, epsilon: f64) -> PlaneClassification {
    if distance > epsilon {
        PlaneClassification::Front
    } else if distance < -epsilon {
        PlaneClassification::Back
    } else {
        PlaneClassification::OnPlane
    }
}

/// Compute oriented volume of tetrahedron (a, b, c, d).
///
/// Six times the signed volume; positive when `d` lies on the side the
/// counter-clockwise triangle `(a, b, c)` faces away from.
pub fn oriented_volume(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    ab.dot(&ac.cross(&ad))
}

/// Triangle area
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Degeneracy predicate applied wherever fragments are created or emitted.
///
/// A triangle is degenerate if any edge is shorter than `edge_epsilon` or any
/// interior angle is smaller than `angle_epsilon` radians.
pub fn is_degenerate(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    edge_epsilon: f64,
    angle_epsilon: f64,
) -> bool {
    let ab = b - a;
    let ac = c - a;
    let cb = b - c;

    let edge_sq = edge_epsilon * edge_epsilon;
    if ab.norm_squared() < edge_sq || ac.norm_squared() < edge_sq || cb.norm_squared() < edge_sq {
        return true;
    }

    let angle_a = ab.angle(&ac);
    let angle_b = (-ab).angle(&(-cb));
    let angle_c = std::f64::consts::PI - angle_a - angle_b;

    !(angle_a >= angle_epsilon && angle_b >= angle_epsilon && angle_c >= angle_epsilon)
}
