// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) evaluation
//!
//! For each operand in turn, triangles touched by the other operand are
//! split against the intersecting triangles and every fragment is classified
//! individually. Untouched triangles are grouped into connected regions that
//! share one classification. The decision table then picks what survives.

use super::assembler::{ResultAssembler, SourceTriangle, WorldFrame};
use super::boolean::{decide, Action, BooleanOp};
use super::brush::{Brush, BrushCache};
use super::classification::{Classifier, Side};
use super::intersection::{collect, IntersectionSets};
use super::triangle_splitting::TriangleSplitter;
use super::GeometryBuffer;
use crate::config::CsgConfig;
use crate::error::{CsgError, Result};
use crate::utils::math::{inverse_or_identity, is_mirroring};
use log::debug;
use nalgebra::{Matrix4, Vector3};
use std::collections::VecDeque;

/// Barycentric corners of an unsplit triangle
fn seed_barycentric() -> [Vector3<f64>; 3] {
    [Vector3::x(), Vector3::y(), Vector3::z()]
}

/// Boolean evaluator. Scratch buffers are reused across evaluations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: CsgConfig,
    splitter: TriangleSplitter,
    assemblers: Vec<ResultAssembler>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(CsgConfig::default())
    }
}

/// One operand's view of a pass
struct Pass<'a> {
    brush: &'a Brush,
    cache: &'a BrushCache,
    other: &'a BrushCache,
    /// This brush's local frame -> other brush's local frame
    to_other: Matrix4<f64>,
    /// Other brush's local frame -> this brush's local frame
    from_other: Matrix4<f64>,
    frame: WorldFrame,
    intersections: &'a IntersectionSets,
    is_second_operand: bool,
    group_offset: usize,
}

impl Evaluator {
    pub fn new(config: CsgConfig) -> Self {
        Self {
            splitter: TriangleSplitter::new(config.tolerances.clone()),
            assemblers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &CsgConfig {
        &self.config
    }

    /// Evaluate one operation, preparing both brushes as needed
    pub fn evaluate(
        &mut self,
        a: &mut Brush,
        b: &mut Brush,
        op: BooleanOp,
    ) -> Result<GeometryBuffer> {
        let mut results = self.evaluate_many(a, b, &[op])?;
        Ok(results.swap_remove(0))
    }

    /// Evaluate several operations sharing intersection, splitting and
    /// classification work. Results come back in the order requested.
    pub fn evaluate_many(
        &mut self,
        a: &mut Brush,
        b: &mut Brush,
        ops: &[BooleanOp],
    ) -> Result<Vec<GeometryBuffer>> {
        check_schemas(a, b)?;
        a.prepare(&self.config)?;
        b.prepare(&self.config)?;
        self.evaluate_prepared_many(a, b, ops)
    }

    /// Read-only evaluation over brushes that are already prepared
    pub fn evaluate_prepared(
        &mut self,
        a: &Brush,
        b: &Brush,
        op: BooleanOp,
    ) -> Result<GeometryBuffer> {
        let mut results = self.evaluate_prepared_many(a, b, &[op])?;
        Ok(results.swap_remove(0))
    }

    /// Read-only evaluation of several operations
    pub fn evaluate_prepared_many(
        &mut self,
        a: &Brush,
        b: &Brush,
        ops: &[BooleanOp],
    ) -> Result<Vec<GeometryBuffer>> {
        let schema = check_schemas(a, b)?;
        let cache_a = prepared_cache(a, &self.config)?;
        let cache_b = prepared_cache(b, &self.config)?;

        if ops.is_empty() {
            return Ok(Vec::new());
        }

        for i in 0..ops.len() {
            let tolerances = self.config.tolerances.clone();
            match self.assemblers.get_mut(i) {
                Some(assembler) => assembler.reset(&schema, tolerances, self.config.use_groups),
                None => self
                    .assemblers
                    .push(ResultAssembler::new(&schema, tolerances, self.config.use_groups)),
            }
        }

        let a_to_b = inverse_or_identity(b.transform()) * a.transform();
        let b_to_a = inverse_or_identity(a.transform()) * b.transform();
        let intersections = collect(cache_a, cache_b, &b_to_a, &self.config.tolerances);
        debug!(
            "{} intersecting triangle pairs ({} of {} triangles in A, {} of {} in B)",
            intersections.pair_count(),
            intersections.a_to_b.len(),
            cache_a.triangles().len(),
            intersections.b_to_a.len(),
            cache_b.triangles().len()
        );

        let first = Pass {
            brush: a,
            cache: cache_a,
            other: cache_b,
            to_other: a_to_b,
            from_other: b_to_a,
            frame: WorldFrame::new(*a.transform()),
            intersections: &intersections.a_to_b,
            is_second_operand: false,
            group_offset: 0,
        };
        run_pass(&self.config, &mut self.splitter, &mut self.assemblers[..ops.len()], &first, ops);

        if ops.iter().any(|op| op.needs_second_operand()) {
            let second = Pass {
                brush: b,
                cache: cache_b,
                other: cache_a,
                to_other: b_to_a,
                from_other: a_to_b,
                frame: WorldFrame::new(*b.transform()),
                intersections: &intersections.b_to_a,
                is_second_operand: true,
                group_offset: if self.config.use_groups { cache_a.max_group() + 1 } else { 0 },
            };
            run_pass(
                &self.config,
                &mut self.splitter,
                &mut self.assemblers[..ops.len()],
                &second,
                ops,
            );
        }

        let results: Vec<GeometryBuffer> = self.assemblers[..ops.len()]
            .iter()
            .map(ResultAssembler::finish)
            .collect();
        for (op, result) in ops.iter().zip(&results) {
            debug!("{op}: {} triangles", result.triangle_count());
        }
        Ok(results)
    }
}

/// Operands must carry identical attribute layouts
fn check_schemas(a: &Brush, b: &Brush) -> Result<super::AttributeSchema> {
    let expected = a.geometry().schema();
    let found = b.geometry().schema();
    if expected != found {
        return Err(CsgError::InputMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(expected)
}

fn prepared_cache<'a>(brush: &'a Brush, config: &CsgConfig) -> Result<&'a BrushCache> {
    if !brush.is_prepared(config) {
        return Err(CsgError::BrushNotPrepared);
    }
    brush.cache().ok_or(CsgError::BrushNotPrepared)
}

fn run_pass(
    config: &CsgConfig,
    splitter: &mut TriangleSplitter,
    assemblers: &mut [ResultAssembler],
    pass: &Pass<'_>,
    ops: &[BooleanOp],
) {
    let classifier = Classifier::new(&pass.other.bvh, pass.to_other, config);
    let own = pass.cache.triangles();
    let other = pass.other.triangles();
    let geometry = pass.brush.geometry();

    let mut emit = |triangle: usize, barycentric: &[Vector3<f64>; 3], side: Side| {
        let source = SourceTriangle {
            geometry,
            vertices: geometry.triangle_indices(triangle),
            frame: &pass.frame,
        };
        let group = pass.cache.groups[triangle] + pass.group_offset;
        for (op, assembler) in ops.iter().zip(assemblers.iter_mut()) {
            match decide(*op, side, pass.is_second_operand) {
                Action::Keep => {
                    assembler.append(group, &source, barycentric, false);
                }
                Action::KeepInverted => {
                    assembler.append(group, &source, barycentric, true);
                }
                Action::Discard => {}
            }
        }
    };

    // split triangles, one classification per fragment
    let mirrored = is_mirroring(&pass.from_other);
    let mut fragment_count = 0;
    let mut coplanar_seeds = 0;
    for (&triangle, cutters) in pass.intersections {
        splitter.initialize(&[own[triangle]]);
        for &cutter in cutters {
            let cutter = other[cutter].transformed(&pass.from_other);
            // keep the cutter facing out of the other solid
            let cutter = if mirrored { cutter.flipped() } else { cutter };
            splitter.split_by_triangle(&cutter);
        }

        for fragment in splitter.fragments() {
            let side = match fragment.coplanar_side {
                Some(true) => Side::CoplanarAligned,
                Some(false) => Side::CoplanarOpposite,
                None => classifier.classify_with_coplanar_check(&fragment.triangle),
            };
            emit(triangle, &fragment.barycentric, side);
        }
        fragment_count += splitter.fragments().len();
        if splitter.coplanar_triangle_used() {
            coplanar_seeds += 1;
        }
    }

    // untouched triangles, one classification per connected region
    let tolerances = &config.tolerances;
    let mut visited = vec![false; own.len()];
    for &triangle in pass.intersections.keys() {
        visited[triangle] = true;
    }

    let whole = seed_barycentric();
    let mut regions = 0;
    let mut queue = VecDeque::new();
    let mut region = Vec::new();
    for seed in 0..own.len() {
        if visited[seed] {
            continue;
        }

        region.clear();
        visited[seed] = true;
        queue.push_back(seed);
        while let Some(triangle) = queue.pop_front() {
            region.push(triangle);
            for neighbor in pass.cache.half_edges.adjacent_triangles(triangle) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        let representative = region
            .iter()
            .copied()
            .find(|&t| {
                !own[t].is_degenerate(tolerances.degenerate_edge, tolerances.degenerate_angle)
            });
        let Some(representative) = representative else {
            continue;
        };

        regions += 1;
        let side = classifier.classify(&own[representative]);
        for &triangle in &region {
            emit(triangle, &whole, side);
        }
    }

    debug!(
        "{} pass: {} fragments from {} split triangles ({} with coplanar cuts), {} whole regions",
        if pass.is_second_operand { "second" } else { "first" },
        fragment_count,
        pass.intersections.len(),
        coplanar_seeds,
        regions
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;

    fn cube_at(x: f64) -> Brush {
        Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())
            .unwrap()
            .with_transform(Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_disjoint_union_keeps_everything() {
        let mut evaluator = Evaluator::default();
        let mut a = cube_at(0.0);
        let mut b = cube_at(3.0);
        let result = evaluator.evaluate(&mut a, &mut b, BooleanOp::Union).unwrap();
        assert_eq!(result.triangle_count(), 24);
    }

    #[test]
    fn test_prepared_path_requires_prepare() {
        let mut evaluator = Evaluator::default();
        let a = cube_at(0.0);
        let b = cube_at(0.5);
        assert!(matches!(
            evaluator.evaluate_prepared(&a, &b, BooleanOp::Subtract),
            Err(CsgError::BrushNotPrepared)
        ));
    }

    #[test]
    fn test_schema_mismatch_is_rejected_before_work() {
        let mut evaluator = Evaluator::default();
        let mut a = cube_at(0.0);
        let mut buffer = Primitive::cube(1.0, Vector3::zeros()).to_buffer();
        buffer.uv = None;
        let mut b = Brush::new(buffer).unwrap();
        let result = evaluator.evaluate(&mut a, &mut b, BooleanOp::Union);
        assert!(matches!(result, Err(CsgError::InputMismatch { .. })));
        assert!(a.cache().is_none());
    }

    #[test]
    fn test_hollow_ops_only_emit_first_operand() {
        let mut evaluator = Evaluator::default();
        let mut a = cube_at(0.0);
        let mut b = cube_at(3.0);
        let results = evaluator
            .evaluate_many(&mut a, &mut b, &[BooleanOp::HollowSubtract, BooleanOp::HollowIntersect])
            .unwrap();
        assert_eq!(results[0].triangle_count(), 12);
        assert_eq!(results[1].triangle_count(), 0);
    }
}
