// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Intersecting triangle pair discovery between two brushes

use super::brush::BrushCache;
use super::triangle_intersection::{coplanar_overlap, triangle_triangle_intersection};
use crate::config::Tolerances;
use nalgebra::Matrix4;
use std::collections::{BTreeMap, BTreeSet};

/// Triangle index -> intersecting triangles of the other brush
pub type IntersectionSets = BTreeMap<usize, BTreeSet<usize>>;

/// Both directions of the intersecting pairs found for one evaluation
#[derive(Debug, Clone, Default)]
pub struct IntersectionMap {
    pub a_to_b: IntersectionSets,
    pub b_to_a: IntersectionSets,
}

impl IntersectionMap {
    /// Number of intersecting triangle pairs
    pub fn pair_count(&self) -> usize {
        self.a_to_b.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.a_to_b.is_empty()
    }

    fn insert(&mut self, a: usize, b: usize) {
        self.a_to_b.entry(a).or_default().insert(b);
        self.b_to_a.entry(b).or_default().insert(a);
    }
}

/// Find every intersecting triangle pair.
///
/// `b_to_a_local` maps `b`'s local frame into `a`'s; all tests run in `a`'s
/// frame. Degenerate triangles on either side are skipped.
pub fn collect(
    a: &BrushCache,
    b: &BrushCache,
    b_to_a_local: &Matrix4<f64>,
    tolerances: &Tolerances,
) -> IntersectionMap {
    let mut map = IntersectionMap::default();
    let edge = tolerances.degenerate_edge;
    let angle = tolerances.degenerate_angle;

    a.bvh.for_each_overlapping_pair(&b.bvh, b_to_a_local, |ia, ib| {
        let tri_a = a.bvh.triangle(ia);
        if tri_a.is_degenerate(edge, angle) {
            return;
        }
        let tri_b = b.bvh.triangle(ib).transformed(b_to_a_local);
        if tri_b.is_degenerate(edge, angle) {
            return;
        }
        if !tri_a.bounding_box().intersects(&tri_b.bounding_box()) {
            return;
        }

        let intersects = triangle_triangle_intersection(tri_a, &tri_b).intersects()
            || coplanar_overlap(tri_a, &tri_b, tolerances.coplanar_plane);
        if intersects {
            map.insert(ia, ib);
        }
    });

    map
}
