// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle splitting for CSG operations
//! Fragments a seed triangle against the planes of intersecting triangles
//!
//! Every fragment carries the barycentric coordinates of its corners relative
//! to the seed it came from, so attributes are always interpolated from the
//! original corners no matter how many cuts a fragment went through.

use super::robust_predicates::{classify_distance, Plane, PlaneClassification};
use super::triangle::Triangle;
use crate::config::Tolerances;
use log::trace;
use nalgebra::{Point3, Vector3};

const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = FRONT | BACK;

/// Corner of a fragment loop
#[derive(Debug, Clone, Copy)]
struct LoopVertex {
    position: Point3<f64>,
    barycentric: Vector3<f64>,
}

/// A piece of a seed triangle
#[derive(Debug, Clone, Copy)]
pub struct TriangleFragment {
    pub triangle: Triangle,
    /// Barycentric coordinates of each corner relative to the seed
    pub barycentric: [Vector3<f64>; 3],
    /// Index of the seed within the initialized group
    pub source: usize,
    /// Latched once the fragment lies inside a coplanar cutter:
    /// `Some(true)` when their normals agree
    pub coplanar_side: Option<bool>,
    /// Edge planes of the current coplanar cutter this fragment is in front of
    coplanar_count: u8,
}

impl TriangleFragment {
    fn seed(triangle: Triangle, source: usize) -> Self {
        Self {
            triangle,
            barycentric: [Vector3::x(), Vector3::y(), Vector3::z()],
            source,
            coplanar_side: None,
            coplanar_count: 0,
        }
    }

    fn corners(&self) -> [LoopVertex; 3] {
        let p = self.triangle.points();
        [0, 1, 2].map(|i| LoopVertex {
            position: p[i],
            barycentric: self.barycentric[i],
        })
    }
}

/// Splits seed triangles against cutting triangles and planes
#[derive(Debug, Clone)]
pub struct TriangleSplitter {
    fragments: Vec<TriangleFragment>,
    scratch: Vec<TriangleFragment>,
    normal: Vector3<f64>,
    tolerances: Tolerances,
    coplanar_cuts: usize,
}

impl TriangleSplitter {
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            fragments: Vec::new(),
            scratch: Vec::new(),
            normal: Vector3::zeros(),
            tolerances,
            coplanar_cuts: 0,
        }
    }

    /// Reset state to the given seed triangles. The first one provides the
    /// reference normal for coplanar detection.
    pub fn initialize(&mut self, seeds: &[Triangle]) {
        self.reset();
        self.normal = seeds.first().map(Triangle::normal).unwrap_or_else(Vector3::zeros);
        self.fragments
            .extend(seeds.iter().enumerate().map(|(i, t)| TriangleFragment::seed(*t, i)));
    }

    /// Drop all fragments, keeping allocations
    pub fn reset(&mut self) {
        self.fragments.clear();
        self.scratch.clear();
        self.coplanar_cuts = 0;
    }

    pub fn fragments(&self) -> &[TriangleFragment] {
        &self.fragments
    }

    /// Whether any cutter so far was coplanar with the seed
    pub fn coplanar_triangle_used(&self) -> bool {
        self.coplanar_cuts > 0
    }

    /// Cut by another triangle. Coplanar cutters cut along their three edge
    /// planes instead of their own plane.
    pub fn split_by_triangle(&mut self, cutter: &Triangle) {
        let cutter_normal = cutter.normal();
        let alignment = self.normal.dot(&cutter_normal);

        if 1.0 - alignment.abs() > self.tolerances.parallel {
            self.split_by_plane(&cutter.plane);
            return;
        }

        // parallel but offset planes never touch
        let seed_plane = Plane::from_normal_and_point(self.normal, &self.fragments_anchor());
        if seed_plane.distance(&cutter.a).abs() > self.tolerances.plane_distance {
            return;
        }

        self.coplanar_cuts += 1;
        for fragment in &mut self.fragments {
            fragment.coplanar_count = 0;
        }

        let points = cutter.points();
        for i in 0..3 {
            let start = points[i];
            let end = points[(i + 1) % 3];
            let inward = cutter_normal.cross(&(end - start));
            let Some(inward) = inward.try_normalize(f64::MIN_POSITIVE) else {
                continue;
            };
            self.split(&Plane::from_normal_and_point(inward, &start), true);
        }

        for fragment in &mut self.fragments {
            if fragment.coplanar_count == 3 && fragment.coplanar_side.is_none() {
                fragment.coplanar_side = Some(fragment.triangle.normal().dot(&cutter_normal) > 0.0);
            }
        }
    }

    /// Cut every fragment by a plane
    pub fn split_by_plane(&mut self, plane: &Plane) {
        self.split(plane, false);
    }

    fn fragments_anchor(&self) -> Point3<f64> {
        self.fragments
            .first()
            .map(|f| f.triangle.a)
            .unwrap_or_else(Point3::origin)
    }

    fn split(&mut self, plane: &Plane, track_coplanar: bool) {
        let epsilon = self.tolerances.plane_distance;
        let mut fragments = std::mem::take(&mut self.fragments);
        self.scratch.clear();

        for fragment in fragments.drain(..) {
            let corners = fragment.corners();
            let distances = corners.map(|c| plane.distance(&c.position));
            let classes = distances.map(|d| classify_distance(d, epsilon));
            let mask = classes.iter().fold(0u8, |acc, c| acc | c.bit());

            if mask != SPANNING {
                let mut kept = fragment;
                // coplanar pieces and pieces touching the plane from the front
                // both count as inside this edge plane
                if track_coplanar && mask & BACK == 0 {
                    kept.coplanar_count += 1;
                }
                self.scratch.push(kept);
                continue;
            }

            let mut front: Vec<LoopVertex> = Vec::with_capacity(4);
            let mut back: Vec<LoopVertex> = Vec::with_capacity(4);
            for i in 0..3 {
                let j = (i + 1) % 3;
                let (vi, ci) = (corners[i], classes[i]);

                if ci != PlaneClassification::Back {
                    front.push(vi);
                }
                if ci != PlaneClassification::Front {
                    back.push(vi);
                }

                let cj = classes[j];
                let crosses = (ci == PlaneClassification::Front && cj == PlaneClassification::Back)
                    || (ci == PlaneClassification::Back && cj == PlaneClassification::Front);
                if crosses {
                    let t = distances[i] / (distances[i] - distances[j]);
                    let vj = corners[j];
                    let crossing = LoopVertex {
                        position: vi.position + (vj.position - vi.position) * t,
                        barycentric: vi.barycentric.lerp(&vj.barycentric, t),
                    };
                    front.push(crossing);
                    back.push(crossing);
                }
            }

            let before = self.scratch.len();
            let front_count = if track_coplanar {
                fragment.coplanar_count + 1
            } else {
                fragment.coplanar_count
            };
            self.emit_fan(&front, &fragment, front_count);
            self.emit_fan(&back, &fragment, fragment.coplanar_count);
            trace!(
                "split fragment of seed {} into {} pieces",
                fragment.source,
                self.scratch.len() - before
            );
        }

        self.fragments = fragments;
        std::mem::swap(&mut self.fragments, &mut self.scratch);
    }

    /// Fan-triangulate a convex loop, dropping degenerate pieces
    fn emit_fan(
        &mut self,
        loop_vertices: &[LoopVertex],
        parent: &TriangleFragment,
        coplanar_count: u8,
    ) {
        if loop_vertices.len() < 3 {
            return;
        }
        let first = loop_vertices[0];
        for window in loop_vertices[1..].windows(2) {
            let (second, third) = (window[0], window[1]);
            let triangle = Triangle::new(first.position, second.position, third.position);
            let tolerances = &self.tolerances;
            if triangle.is_degenerate(tolerances.degenerate_edge, tolerances.degenerate_angle) {
                continue;
            }
            self.scratch.push(TriangleFragment {
                triangle,
                barycentric: [first.barycentric, second.barycentric, third.barycentric],
                source: parent.source,
                coplanar_side: parent.coplanar_side,
                coplanar_count,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(Point3::from(a), Point3::from(b), Point3::from(c))
    }

    fn total_area(splitter: &TriangleSplitter) -> f64 {
        splitter.fragments().iter().map(|f| f.triangle.area()).sum()
    }

    fn seed() -> Triangle {
        tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0])
    }

    #[test]
    fn test_plane_split_conserves_area_and_winding() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        splitter.split_by_plane(&Plane::new(Vector3::x(), 0.5));

        assert_eq!(splitter.fragments().len(), 3);
        assert_relative_eq!(total_area(&splitter), 2.0, epsilon = 1e-12);
        for fragment in splitter.fragments() {
            assert!(fragment.triangle.normal().z > 0.99);
        }
    }

    #[test]
    fn test_plane_through_vertex() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        // x = y passes through the corner at the origin
        let normal = Vector3::new(1.0, -1.0, 0.0).normalize();
        splitter.split_by_plane(&Plane::new(normal, 0.0));

        assert_eq!(splitter.fragments().len(), 2);
        assert_relative_eq!(total_area(&splitter), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_plane_leaves_triangle_untouched() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        splitter.split_by_plane(&Plane::new(Vector3::x(), 5.0));
        assert_eq!(splitter.fragments().len(), 1);
        assert_eq!(splitter.fragments()[0].triangle, seed());
    }

    #[test]
    fn test_barycentrics_reproduce_positions() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        let seed = seed();
        splitter.initialize(&[seed]);
        splitter.split_by_triangle(&tri([0.3, -1.0, -1.0], [0.3, -1.0, 1.0], [0.9, 3.0, 0.0]));
        splitter.split_by_plane(&Plane::new(Vector3::y(), 0.7));
        assert!(splitter.fragments().len() > 2);

        for fragment in splitter.fragments() {
            for (corner, bary) in fragment.triangle.points().iter().zip(fragment.barycentric) {
                let rebuilt =
                    seed.a.coords * bary.x + seed.b.coords * bary.y + seed.c.coords * bary.z;
                assert_relative_eq!(rebuilt, corner.coords, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(total_area(&splitter), seed.area(), epsilon = 1e-12);
    }

    #[test]
    fn test_coplanar_cutter_latches_inner_fragments() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        // same plane, opposite winding, covering the corner region
        let cutter = tri([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        splitter.split_by_triangle(&cutter);

        assert!(splitter.coplanar_triangle_used());
        assert_relative_eq!(total_area(&splitter), 2.0, epsilon = 1e-12);

        let latched: Vec<_> = splitter
            .fragments()
            .iter()
            .filter(|f| f.coplanar_side.is_some())
            .collect();
        let latched_area: f64 = latched.iter().map(|f| f.triangle.area()).sum();
        assert_relative_eq!(latched_area, 0.5, epsilon = 1e-12);
        assert!(latched.iter().all(|f| f.coplanar_side == Some(false)));
    }

    #[test]
    fn test_identical_coplanar_cutter_latches_whole_seed() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        splitter.split_by_triangle(&seed());

        assert_eq!(splitter.fragments().len(), 1);
        assert_eq!(splitter.fragments()[0].coplanar_side, Some(true));
    }

    #[test]
    fn test_offset_parallel_cutter_is_ignored() {
        let mut splitter = TriangleSplitter::new(Tolerances::default());
        splitter.initialize(&[seed()]);
        splitter.split_by_triangle(&tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]));
        assert!(!splitter.coplanar_triangle_used());
        assert_eq!(splitter.fragments().len(), 1);
    }
}
