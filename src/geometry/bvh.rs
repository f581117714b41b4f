// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//! Used for nearest-hit ray queries and dual-tree triangle pair enumeration

use super::triangle::Triangle;
use super::BoundingBox;
use crate::config::BvhConfig;
use nalgebra::{Matrix4, Point3, Vector3};

/// Ray with an origin and (not necessarily unit) direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Nearest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the hit (world distance for unit directions)
    pub distance: f64,
    pub point: Point3<f64>,
    /// Geometric normal of the hit triangle, following its winding
    pub face_normal: Vector3<f64>,
    pub triangle: usize,
}

/// BVH node stored in the tree's arena
#[derive(Debug, Clone)]
pub struct BVHNode {
    /// Bounding box of this node
    pub bbox: BoundingBox,
    /// Child node indices (None for leaf)
    pub children: Option<(usize, usize)>,
    /// First entry in the tree's triangle order (leaves only)
    pub start: usize,
    /// Number of triangles (leaves only)
    pub count: usize,
}

/// Bounding Volume Hierarchy over one brush's local-space triangles
#[derive(Debug, Clone)]
pub struct BVH {
    nodes: Vec<BVHNode>,
    order: Vec<usize>,
    triangles: Vec<Triangle>,
}

impl BVH {
    /// Build BVH from triangles, splitting at the centroid median of the
    /// longest axis
    pub fn build(triangles: Vec<Triangle>, config: &BvhConfig) -> Self {
        let boxes: Vec<BoundingBox> = triangles.iter().map(Triangle::bounding_box).collect();
        let centroids: Vec<Point3<f64>> = triangles.iter().map(Triangle::midpoint).collect();

        let mut bvh = Self {
            nodes: Vec::new(),
            order: (0..triangles.len()).collect(),
            triangles,
        };

        if bvh.triangles.is_empty() {
            bvh.nodes.push(BVHNode {
                bbox: BoundingBox::empty(),
                children: None,
                start: 0,
                count: 0,
            });
            return bvh;
        }

        let count = bvh.order.len();
        bvh.build_recursive(0, count, 0, &boxes, &centroids, config);
        bvh
    }

    /// Recursively build BVH node, returns its arena index
    fn build_recursive(
        &mut self,
        start: usize,
        count: usize,
        depth: usize,
        boxes: &[BoundingBox],
        centroids: &[Point3<f64>],
        config: &BvhConfig,
    ) -> usize {
        let bbox = self.order[start..start + count]
            .iter()
            .fold(BoundingBox::empty(), |acc, &t| acc.union(&boxes[t]));

        let node_index = self.nodes.len();
        self.nodes.push(BVHNode {
            bbox,
            children: None,
            start,
            count,
        });

        if count <= config.max_leaf_triangles.max(1) || depth >= config.max_depth {
            return node_index;
        }

        let centroid_box = BoundingBox::from_points(
            self.order[start..start + count].iter().map(|&t| &centroids[t]),
        );
        let axis = centroid_box.longest_axis();
        self.order[start..start + count]
            .sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));

        let mid = count / 2;
        let left = self.build_recursive(start, mid, depth + 1, boxes, centroids, config);
        let right =
            self.build_recursive(start + mid, count - mid, depth + 1, boxes, centroids, config);

        let node = &mut self.nodes[node_index];
        node.children = Some((left, right));
        node.count = 0;
        node_index
    }

    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.nodes[0].bbox
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn leaf_triangles(&self, node: &BVHNode) -> &[usize] {
        &self.order[node.start..node.start + node.count]
    }

    /// Nearest double-sided hit with a non-negative ray parameter
    pub fn raycast_first(&self, ray: &Ray) -> Option<RayHit> {
        if self.is_empty() {
            return None;
        }

        let inv_direction = ray.direction.map(|c| 1.0 / c);
        let mut best: Option<RayHit> = None;
        let mut stack = vec![0usize];

        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            let Some(entry) = node.bbox.ray_entry(&ray.origin, &inv_direction) else {
                continue;
            };
            if best.is_some_and(|hit| entry > hit.distance) {
                continue;
            }

            match node.children {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => {
                    for &t in self.leaf_triangles(node) {
                        let Some(distance) = intersect_ray_triangle(ray, &self.triangles[t]) else {
                            continue;
                        };
                        let closer = best.map_or(true, |hit| {
                            distance < hit.distance
                                || (distance == hit.distance && t < hit.triangle)
                        });
                        if closer {
                            best = Some(RayHit {
                                distance,
                                point: ray.at(distance),
                                face_normal: self.triangles[t].normal(),
                                triangle: t,
                            });
                        }
                    }
                }
            }
        }

        best
    }

    /// Enumerate every `(this_triangle, other_triangle)` pair whose leaf boxes
    /// overlap. `relative` maps the other tree's local frame into this one.
    pub fn for_each_overlapping_pair<F>(
        &self,
        other: &BVH,
        relative: &Matrix4<f64>,
        mut callback: F,
    )
    where
        F: FnMut(usize, usize),
    {
        if self.is_empty() || other.is_empty() {
            return;
        }

        let mut stack = vec![(0usize, 0usize)];
        while let Some((a_index, b_index)) = stack.pop() {
            let node_a = &self.nodes[a_index];
            let node_b = &other.nodes[b_index];
            let bbox_b = node_b.bbox.transformed(relative);
            if !node_a.bbox.intersects(&bbox_b) {
                continue;
            }

            match (node_a.children, node_b.children) {
                (None, None) => {
                    for &ta in self.leaf_triangles(node_a) {
                        for &tb in other.leaf_triangles(node_b) {
                            callback(ta, tb);
                        }
                    }
                }
                (Some((left, right)), None) => {
                    stack.push((right, b_index));
                    stack.push((left, b_index));
                }
                (None, Some((left, right))) => {
                    stack.push((a_index, right));
                    stack.push((a_index, left));
                }
                (Some((a_left, a_right)), Some((b_left, b_right))) => {
                    // descend the larger box first
                    let a_size = node_a.bbox.size().norm_squared();
                    let b_size = bbox_b.size().norm_squared();
                    if a_size >= b_size {
                        stack.push((a_right, b_index));
                        stack.push((a_left, b_index));
                    } else {
                        stack.push((a_index, b_right));
                        stack.push((a_index, b_left));
                    }
                }
            }
        }
    }
}

/// Möller-Trumbore, double sided. Returns the ray parameter of the hit.
fn intersect_ray_triangle(ray: &Ray, triangle: &Triangle) -> Option<f64> {
    let edge1 = triangle.b - triangle.a;
    let edge2 = triangle.c - triangle.a;
    let p = ray.direction.cross(&edge2);
    let det = edge1.dot(&p);

    let scale = edge1.norm() * edge2.norm() * ray.direction.norm();
    if det.abs() <= f64::EPSILON * scale || scale == 0.0 {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - triangle.a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(&q) * inv_det;
    (t >= 0.0).then_some(t)
}
