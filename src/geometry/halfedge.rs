// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Half-edge adjacency for triangle soups
//!
//! Vertices are identified by position hashed at a fixed quantization, so
//! non-indexed buffers (three independent vertices per triangle) still get
//! full connectivity. Half-edge `3 * t + k` runs from corner `k` to corner
//! `k + 1` of triangle `t`.

use super::triangle::Triangle;
use crate::config::Tolerances;
use ahash::AHashMap;
use log::trace;
use nalgebra::{Point3, Vector3};

type VertexKey = (i64, i64, i64);

/// Connectivity map pairing each directed edge with its reverse sibling
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMap {
    /// Reverse-direction sibling per half-edge
    siblings: Vec<Option<usize>>,
    /// Collinear, partially overlapping reverse edges found by disjoint repair
    disjoint: AHashMap<usize, Vec<usize>>,
    /// Edges with no sibling that disjoint repair did not fully cover, sorted
    unmatched: Vec<usize>,
}

/// Unmatched edge as a parameterized segment
#[derive(Debug, Clone, Copy)]
struct EdgeSegment {
    edge: usize,
    start: Point3<f64>,
    /// Unit direction from start to end
    direction: Vector3<f64>,
    length: f64,
}

impl EdgeSegment {
    fn new(edge: usize, triangles: &[Triangle]) -> Option<Self> {
        let points = triangles[edge / 3].points();
        let k = edge % 3;
        let start = points[k];
        let delta = points[(k + 1) % 3] - start;
        let length = delta.norm();
        let direction = delta.try_normalize(f64::MIN_POSITIVE)?;
        Some(Self {
            edge,
            start,
            direction,
            length,
        })
    }

    fn end(&self) -> Point3<f64> {
        self.start + self.direction * self.length
    }

    /// Distance of a point from the carrier line
    fn line_distance(&self, point: &Point3<f64>) -> f64 {
        let offset = point - self.start;
        (offset - self.direction * offset.dot(&self.direction)).norm()
    }

    /// Part of this segment covered by the projection of `other`
    fn overlap(&self, other: &EdgeSegment) -> (f64, f64) {
        let t0 = (other.start - self.start).dot(&self.direction);
        let t1 = (other.end() - self.start).dot(&self.direction);
        (t0.min(t1).max(0.0), t0.max(t1).min(self.length))
    }

    /// Grid cells touched by the segment's bounds grown by `margin`
    fn cells(&self, cell: f64, margin: f64) -> impl Iterator<Item = VertexKey> {
        let end = self.end();
        let lo = self.start.coords.inf(&end.coords).add_scalar(-margin) / cell;
        let hi = self.start.coords.sup(&end.coords).add_scalar(margin) / cell;
        let (x0, y0, z0) = (lo.x.floor() as i64, lo.y.floor() as i64, lo.z.floor() as i64);
        let (x1, y1, z1) = (hi.x.floor() as i64, hi.y.floor() as i64, hi.z.floor() as i64);
        (x0..=x1).flat_map(move |x| (y0..=y1).flat_map(move |y| (z0..=z1).map(move |z| (x, y, z))))
    }
}

impl HalfEdgeMap {
    /// Build connectivity for the given triangles
    pub fn build(triangles: &[Triangle], tolerances: &Tolerances, match_disjoint: bool) -> Self {
        let precision = tolerances.half_edge_precision;
        let edge_count = triangles.len() * 3;

        let mut siblings = vec![None; edge_count];
        let mut open: AHashMap<(VertexKey, VertexKey), Vec<usize>> = AHashMap::new();

        for (t, triangle) in triangles.iter().enumerate() {
            let keys = triangle.points().map(|p| hash_vertex(&p, precision));
            for k in 0..3 {
                let from = keys[k];
                let to = keys[(k + 1) % 3];
                if from == to {
                    // collapsed edge, neither matched nor a boundary
                    continue;
                }

                let edge = 3 * t + k;
                let reverse = open.get_mut(&(to, from)).filter(|edges| !edges.is_empty());
                match reverse {
                    Some(edges) => {
                        let other = edges.remove(0);
                        siblings[edge] = Some(other);
                        siblings[other] = Some(edge);
                    }
                    None => open.entry((from, to)).or_default().push(edge),
                }
            }
        }

        let mut unmatched: Vec<usize> = open.into_iter().flat_map(|(_, edges)| edges).collect();
        unmatched.sort_unstable();

        let mut map = Self {
            siblings,
            disjoint: AHashMap::new(),
            unmatched,
        };

        if match_disjoint && !map.unmatched.is_empty() {
            map.match_disjoint_edges(triangles, tolerances);
        }

        map
    }

    /// Pair collinear, overlapping, opposite-direction unmatched edges.
    ///
    /// Only connectivity is recorded; geometry is untouched. Edges whose
    /// interval is not fully covered by reverse edges stay unmatched.
    /// Collinearity is judged by endpoint distance to the longer edge's line,
    /// with a tolerance that grows with model size so single-precision
    /// output still pairs up.
    fn match_disjoint_edges(&mut self, triangles: &[Triangle], tolerances: &Tolerances) {
        let segments: Vec<EdgeSegment> = self
            .unmatched
            .iter()
            .filter_map(|&edge| EdgeSegment::new(edge, triangles))
            .collect();

        let extent = segments
            .iter()
            .flat_map(|s| [s.start.coords.amax(), s.end().coords.amax()])
            .fold(0.0, f64::max);
        let tolerance = tolerances.disjoint_distance.max(extent * tolerances.disjoint_relative);

        // cells at least as large as the longest edge keep each edge in a few buckets
        let cell = segments.iter().map(|s| s.length).fold(tolerance, f64::max);
        let mut buckets: AHashMap<VertexKey, Vec<usize>> = AHashMap::new();
        for (i, segment) in segments.iter().enumerate() {
            for key in segment.cells(cell, tolerance) {
                buckets.entry(key).or_default().push(i);
            }
        }

        let mut covered: Vec<Vec<(f64, f64)>> = vec![Vec::new(); segments.len()];
        let mut candidates = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            candidates.clear();
            for key in segment.cells(cell, tolerance) {
                if let Some(bucket) = buckets.get(&key) {
                    candidates.extend(bucket.iter().copied().filter(|&j| j > i));
                }
            }
            candidates.sort_unstable();
            candidates.dedup();

            for &j in &candidates {
                let other = &segments[j];
                if let Some((on_segment, on_other)) = reverse_overlap(segment, other, tolerance) {
                    self.disjoint.entry(segment.edge).or_default().push(other.edge);
                    self.disjoint.entry(other.edge).or_default().push(segment.edge);
                    covered[i].push(on_segment);
                    covered[j].push(on_other);
                }
            }
        }

        let still_unmatched: Vec<usize> = segments
            .iter()
            .zip(covered)
            .filter_map(|(segment, intervals)| {
                (!interval_covered(segment.length, intervals, tolerance)).then_some(segment.edge)
            })
            .collect();

        trace!(
            "disjoint edge repair: {} buckets, tolerance {:e}, {} -> {} unmatched edges",
            buckets.len(),
            tolerance,
            self.unmatched.len(),
            still_unmatched.len()
        );
        self.unmatched = still_unmatched;
    }

    /// Reverse sibling of a half-edge
    pub fn sibling_edge(&self, edge: usize) -> Option<usize> {
        self.siblings.get(edge).copied().flatten()
    }

    /// Triangle owning the reverse sibling of a half-edge
    pub fn sibling_triangle(&self, edge: usize) -> Option<usize> {
        self.sibling_edge(edge).map(|e| e / 3)
    }

    /// Collinear reverse edges paired by disjoint repair
    pub fn disjoint_siblings(&self, edge: usize) -> &[usize] {
        self.disjoint.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Triangles sharing an edge (exactly or through disjoint repair)
    pub fn adjacent_triangles(&self, triangle: usize) -> Vec<usize> {
        let mut adjacent = Vec::new();
        for edge in 3 * triangle..3 * triangle + 3 {
            if let Some(t) = self.sibling_triangle(edge) {
                adjacent.push(t);
            }
            adjacent.extend(self.disjoint_siblings(edge).iter().map(|e| e / 3));
        }
        adjacent
    }

    /// Boundary or non-manifold edges
    pub fn unmatched_edges(&self) -> &[usize] {
        &self.unmatched
    }

    pub fn unmatched_edge_count(&self) -> usize {
        self.unmatched.len()
    }

    /// Every edge has a partner
    pub fn is_manifold(&self) -> bool {
        self.unmatched.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.siblings.len()
    }
}

/// Quantize a position to a vertex identity key
fn hash_vertex(point: &Point3<f64>, precision: f64) -> VertexKey {
    (
        (point.x / precision).round() as i64,
        (point.y / precision).round() as i64,
        (point.z / precision).round() as i64,
    )
}

/// Overlap of two opposite, collinear segments, expressed on each of them
fn reverse_overlap(
    a: &EdgeSegment,
    b: &EdgeSegment,
    tolerance: f64,
) -> Option<((f64, f64), (f64, f64))> {
    if a.direction.dot(&b.direction) >= 0.0 {
        return None;
    }

    // the longer edge carries the more accurate line
    let (long, short) = if a.length >= b.length { (a, b) } else { (b, a) };
    if long.line_distance(&short.start) > tolerance
        || long.line_distance(&short.end()) > tolerance
    {
        return None;
    }

    let on_a = a.overlap(b);
    let on_b = b.overlap(a);
    if on_a.1 - on_a.0 <= tolerance || on_b.1 - on_b.0 <= tolerance {
        return None;
    }
    Some((on_a, on_b))
}

/// Whether the union of `intervals` covers `[0, length]` up to `tolerance`
fn interval_covered(length: f64, mut intervals: Vec<(f64, f64)>, tolerance: f64) -> bool {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut reached: f64 = 0.0;
    for (lo, hi) in intervals {
        if lo > reached + tolerance {
            return false;
        }
        reached = reached.max(hi);
    }
    reached + tolerance >= length
}
