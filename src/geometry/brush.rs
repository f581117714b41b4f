// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operand: a geometry buffer, its world transform and derived caches

use super::bvh::BVH;
use super::halfedge::HalfEdgeMap;
use super::triangle::Triangle;
use super::GeometryBuffer;
use crate::config::{BvhConfig, CsgConfig, Tolerances};
use crate::error::Result;
use log::{debug, warn};
use nalgebra::Matrix4;

/// Acceleration structures derived from a brush's geometry
#[derive(Debug, Clone)]
pub struct BrushCache {
    /// Transform recorded as the clean baseline
    pub transform: Matrix4<f64>,
    /// Local-space spatial index (owns the local triangles)
    pub bvh: BVH,
    pub half_edges: HalfEdgeMap,
    /// Material index per triangle
    pub groups: Vec<usize>,
    tolerances: Tolerances,
    bvh_config: BvhConfig,
    match_disjoint: bool,
}

impl BrushCache {
    fn built_with(&self, config: &CsgConfig) -> bool {
        self.tolerances == config.tolerances
            && self.bvh_config == config.bvh
            && self.match_disjoint == config.match_disjoint_edges
    }

    /// Local-space triangles in index order
    pub fn triangles(&self) -> &[Triangle] {
        self.bvh.triangles()
    }

    /// Largest material index in use
    pub fn max_group(&self) -> usize {
        self.groups.iter().copied().max().unwrap_or(0)
    }
}

/// One operand of a boolean evaluation
#[derive(Debug, Clone)]
pub struct Brush {
    geometry: GeometryBuffer,
    transform: Matrix4<f64>,
    cache: Option<BrushCache>,
    geometry_dirty: bool,
}

impl Brush {
    /// Wrap a geometry buffer with an identity transform
    pub fn new(geometry: GeometryBuffer) -> Result<Self> {
        geometry.validate()?;
        Ok(Self {
            geometry,
            transform: Matrix4::identity(),
            cache: None,
            geometry_dirty: false,
        })
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn set_transform(&mut self, transform: Matrix4<f64>) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    /// Mutable access to the geometry; caches are rebuilt on the next prepare
    pub fn geometry_mut(&mut self) -> &mut GeometryBuffer {
        self.geometry_dirty = true;
        &mut self.geometry
    }

    pub fn cache(&self) -> Option<&BrushCache> {
        self.cache.as_ref()
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    /// Caches are missing, the geometry was touched, or the transform moved
    /// away from the baseline
    pub fn is_dirty(&self) -> bool {
        match &self.cache {
            Some(cache) => self.geometry_dirty || cache.transform != self.transform,
            None => true,
        }
    }

    /// Record the current transform as the clean baseline. Geometry edits
    /// still require [`Brush::prepare`].
    pub fn mark_clean(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.transform = self.transform;
        }
    }

    /// Caches are current for this configuration
    pub fn is_prepared(&self, config: &CsgConfig) -> bool {
        !self.is_dirty() && self.cache.as_ref().is_some_and(|cache| cache.built_with(config))
    }

    /// Ensure spatial index, half-edge map and group lookup are current
    pub fn prepare(&mut self, config: &CsgConfig) -> Result<()> {
        if self.is_prepared(config) {
            return Ok(());
        }

        if self.geometry_dirty {
            self.geometry.validate()?;
        }
        if let Some(previous) = &self.cache {
            debug!(
                "rebuilding brush caches (transform changed: {}, geometry changed: {})",
                previous.transform != self.transform,
                self.geometry_dirty
            );
        }

        if self.geometry.index.is_none() {
            let count = self.geometry.vertex_count() as u32;
            self.geometry.index = Some((0..count).collect());
        }

        self.cache = Some(self.rebuild(config));
        self.geometry_dirty = false;
        Ok(())
    }

    fn rebuild(&self, config: &CsgConfig) -> BrushCache {
        let position = &self.geometry.position;
        let triangles: Vec<Triangle> = (0..self.geometry.triangle_count())
            .map(|t| {
                let [a, b, c] = self.geometry.triangle_indices(t);
                Triangle::new(position.point(a), position.point(b), position.point(c))
            })
            .collect();

        let half_edges =
            HalfEdgeMap::build(&triangles, &config.tolerances, config.match_disjoint_edges);
        if !half_edges.is_manifold() {
            warn!(
                "brush has {} unmatched half-edges; boolean results may not be closed",
                half_edges.unmatched_edge_count()
            );
        }

        let groups = self.material_groups(triangles.len());
        let bvh = BVH::build(triangles, &config.bvh);

        BrushCache {
            transform: self.transform,
            bvh,
            half_edges,
            groups,
            tolerances: config.tolerances.clone(),
            bvh_config: config.bvh.clone(),
            match_disjoint: config.match_disjoint_edges,
        }
    }

    /// Material index per triangle; triangles outside every group use 0
    fn material_groups(&self, triangle_count: usize) -> Vec<usize> {
        let mut groups = vec![0; triangle_count];
        for range in &self.geometry.groups {
            let first = range.start / 3;
            let last = ((range.start + range.count) / 3).min(triangle_count);
            for slot in groups.iter_mut().take(last).skip(first) {
                *slot = range.material_index;
            }
        }
        groups
    }

    /// Unmatched half-edges, once prepared
    pub fn unmatched_edge_count(&self) -> Option<usize> {
        self.cache.as_ref().map(|cache| cache.half_edges.unmatched_edge_count())
    }

    /// Whether every edge found a partner, once prepared
    pub fn is_manifold(&self) -> Option<bool> {
        self.cache.as_ref().map(|cache| cache.half_edges.is_manifold())
    }
}
