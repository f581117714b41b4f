// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-triangle intersection tests
//! Strict edge/plane test plus a 2D separating-axis test for coplanar pairs

use super::robust_predicates::Plane;
use super::triangle::Triangle;
use nalgebra::{Point2, Point3, Vector2, Vector3};

/// Slack used by the point-in-triangle test of pierce points
const INSIDE_EPSILON: f64 = 1e-12;

/// Type of triangle-triangle intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionType {
    /// No intersection
    None,
    /// Triangles are coplanar and overlap
    Coplanar,
    /// Triangles intersect at a point
    Point,
    /// Triangles intersect along a line segment
    Segment,
}

impl IntersectionType {
    pub fn intersects(self) -> bool {
        self != IntersectionType::None
    }
}

/// Strict intersection test.
///
/// Vertices exactly on the other plane count as touching it; coplanar pairs
/// are only reported when their interiors overlap.
pub fn triangle_triangle_intersection(tri_a: &Triangle, tri_b: &Triangle) -> IntersectionType {
    let dist_a = signed_distances(tri_a, &tri_b.plane);
    if all_strictly_one_side(&dist_a) {
        return IntersectionType::None;
    }

    let dist_b = signed_distances(tri_b, &tri_a.plane);
    if all_strictly_one_side(&dist_b) {
        return IntersectionType::None;
    }

    if dist_a.iter().all(|d| *d == 0.0) {
        return coplanar_result(tri_a, tri_b);
    }

    let mut pierce_points = Vec::new();
    collect_pierce_points(tri_a, &dist_a, tri_b, &mut pierce_points);
    collect_pierce_points(tri_b, &dist_b, tri_a, &mut pierce_points);

    match deduplicate_points(pierce_points).len() {
        0 => IntersectionType::None,
        1 => IntersectionType::Point,
        _ => IntersectionType::Segment,
    }
}

/// Rounding-tolerant fallback: planes equal within `epsilon` (in either
/// orientation) and interiors overlapping in the shared plane.
pub fn coplanar_overlap(tri_a: &Triangle, tri_b: &Triangle, epsilon: f64) -> bool {
    let na = tri_a.plane.normal;
    let nb = tri_b.plane.normal;
    let same = (na - nb).norm() <= epsilon && (tri_a.plane.w - tri_b.plane.w).abs() <= epsilon;
    let opposite = (na + nb).norm() <= epsilon && (tri_a.plane.w + tri_b.plane.w).abs() <= epsilon;
    if !same && !opposite {
        return false;
    }
    overlap_2d(tri_a, tri_b)
}

fn coplanar_result(tri_a: &Triangle, tri_b: &Triangle) -> IntersectionType {
    if overlap_2d(tri_a, tri_b) {
        IntersectionType::Coplanar
    } else {
        IntersectionType::None
    }
}

fn signed_distances(triangle: &Triangle, plane: &Plane) -> [f64; 3] {
    [
        plane.distance(&triangle.a),
        plane.distance(&triangle.b),
        plane.distance(&triangle.c),
    ]
}

fn all_strictly_one_side(distances: &[f64; 3]) -> bool {
    distances.iter().all(|d| *d > 0.0) || distances.iter().all(|d| *d < 0.0)
}

/// Points where edges of `source` cross `target`'s plane inside `target`
fn collect_pierce_points(
    source: &Triangle,
    distances: &[f64; 3],
    target: &Triangle,
    out: &mut Vec<Point3<f64>>,
) {
    let points = source.points();
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (d0, d1) = (distances[i], distances[j]);

        if d0 == 0.0 {
            if point_in_triangle(&points[i], target) {
                out.push(points[i]);
            }
            continue;
        }
        if d0 * d1 >= 0.0 {
            continue;
        }

        let t = d0 / (d0 - d1);
        let intersection = points[i] + (points[j] - points[i]) * t;
        if point_in_triangle(&intersection, target) {
            out.push(intersection);
        }
    }
}

/// Test if point is inside triangle (projected to 2D)
fn point_in_triangle(point: &Point3<f64>, triangle: &Triangle) -> bool {
    let axis = dominant_axis(&triangle.plane.normal);
    let p = project(point, axis);
    let [a, b, c] = triangle.points().map(|v| project(&v, axis));

    let d1 = cross_2d(&(b - a), &(p - a));
    let d2 = cross_2d(&(c - b), &(p - b));
    let d3 = cross_2d(&(a - c), &(p - c));

    let scale = cross_2d(&(b - a), &(c - a)).abs().max(f64::MIN_POSITIVE);
    let slack = INSIDE_EPSILON * scale;
    let has_neg = d1 < -slack || d2 < -slack || d3 < -slack;
    let has_pos = d1 > slack || d2 > slack || d3 > slack;
    !(has_neg && has_pos)
}

/// Separating-axis test of two coplanar triangles in their shared plane.
/// Triangles that only touch along an edge or at a vertex do not overlap.
fn overlap_2d(tri_a: &Triangle, tri_b: &Triangle) -> bool {
    let axis = dominant_axis(&tri_a.plane.normal);
    let a = tri_a.points().map(|v| project(&v, axis));
    let b = tri_b.points().map(|v| project(&v, axis));

    let scale = (a[1] - a[0]).norm().max((b[1] - b[0]).norm()).max(f64::MIN_POSITIVE);
    let slack = INSIDE_EPSILON * scale;

    for tri in [&a, &b] {
        for i in 0..3 {
            let edge = tri[(i + 1) % 3] - tri[i];
            let axis_2d = Vector2::new(-edge.y, edge.x);
            let length = axis_2d.norm();
            if length <= f64::MIN_POSITIVE {
                continue;
            }
            let axis_2d = axis_2d / length;

            let (min_a, max_a) = interval(&a, &axis_2d);
            let (min_b, max_b) = interval(&b, &axis_2d);
            if max_a <= min_b + slack || max_b <= min_a + slack {
                return false;
            }
        }
    }
    true
}

fn interval(points: &[Point2<f64>; 3], axis: &Vector2<f64>) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.coords.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn dominant_axis(normal: &Vector3<f64>) -> usize {
    let abs = normal.abs();
    if abs.x > abs.y && abs.x > abs.z {
        0
    } else if abs.y > abs.z {
        1
    } else {
        2
    }
}

/// Drop the dominant axis. Handedness may flip; callers only compare signs
/// within one projection.
fn project(point: &Point3<f64>, axis: usize) -> Point2<f64> {
    match axis {
        0 => Point2::new(point.y, point.z),
        1 => Point2::new(point.x, point.z),
        _ => Point2::new(point.x, point.y),
    }
}

fn cross_2d(u: &Vector2<f64>, v: &Vector2<f64>) -> f64 {
    u.x * v.y - u.y * v.x
}

/// Deduplicate points that are very close together
fn deduplicate_points(points: Vec<Point3<f64>>) -> Vec<Point3<f64>> {
    const EPSILON: f64 = 1e-10;
    let mut result: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for point in points {
        if !result.iter().any(|p| (p - point).norm() < EPSILON) {
            result.push(point);
        }
    }
    result
}
