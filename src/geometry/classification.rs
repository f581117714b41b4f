// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fragment classification for CSG operations
//! Determines if fragments are inside, outside, or on the boundary of the
//! other solid by casting rays against its spatial index

use super::bvh::{Ray, BVH};
use super::triangle::Triangle;
use crate::config::CsgConfig;
use crate::utils::math::normal_matrix;
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Side of the other solid a fragment lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Outside the other solid
    Front,
    /// Inside the other solid
    Back,
    /// On the other solid's surface, normals agreeing
    CoplanarAligned,
    /// On the other solid's surface, normals opposing
    CoplanarOpposite,
}

/// Plastic number, generator of the R3 low-discrepancy sequence
const PLASTIC: f64 = 1.220_744_084_605_759_5;

/// Deterministic quasi-random jitter in `[-1, 1)^3`
fn r3_jitter(n: usize) -> Vector3<f64> {
    let alpha = Vector3::new(
        1.0 / PLASTIC,
        1.0 / (PLASTIC * PLASTIC),
        1.0 / (PLASTIC * PLASTIC * PLASTIC),
    );
    let step = (n + 1) as f64;
    alpha.map(|a| (0.5 + a * step).fract() * 2.0 - 1.0)
}

/// Classifies fragments of one brush against another brush.
///
/// Fragments are given in their own brush's local frame; rays are cast in
/// the other brush's local frame.
pub struct Classifier<'a> {
    other: &'a BVH,
    to_other: Matrix4<f64>,
    normals_to_other: Matrix3<f64>,
    config: &'a CsgConfig,
}

impl<'a> Classifier<'a> {
    /// `to_other` maps this brush's local frame into `other`'s local frame
    pub fn new(other: &'a BVH, to_other: Matrix4<f64>, config: &'a CsgConfig) -> Self {
        Self {
            other,
            normals_to_other: normal_matrix(&to_other),
            to_other,
            config,
        }
    }

    fn ray_for(&self, triangle: &Triangle) -> (Ray, Vector3<f64>) {
        let origin = self.to_other.transform_point(&triangle.midpoint());
        let normal = (self.normals_to_other * triangle.normal())
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros);
        (Ray::new(origin, normal), normal)
    }

    /// Single ray along the fragment normal. A hit on a face pointing the
    /// same way as the ray means the fragment is inside.
    pub fn classify(&self, triangle: &Triangle) -> Side {
        let (ray, _) = self.ray_for(triangle);
        match self.other.raycast_first(&ray) {
            Some(hit) if ray.direction.dot(&hit.face_normal) > 0.0 => Side::Back,
            _ => Side::Front,
        }
    }

    /// Jittered vote over alternating ray directions with coplanar detection.
    ///
    /// A hit closer than the touching tolerance reports the fragment as lying
    /// on the other surface. Ties and misses resolve to [`Side::Front`].
    pub fn classify_with_coplanar_check(&self, triangle: &Triangle) -> Side {
        let (ray, normal) = self.ray_for(triangle);
        let samples = self.config.vote_samples.max(1);
        let jitter = self.config.tolerances.jitter;
        let touching = self.config.tolerances.touching;

        let mut back_votes = 0usize;
        let mut min_distance = f64::INFINITY;

        for i in 0..samples {
            // start reversed, then alternate
            let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
            let direction = (normal + r3_jitter(i) * jitter) * sign;
            let direction = direction.try_normalize(f64::MIN_POSITIVE).unwrap_or(direction);
            let sample = Ray::new(ray.origin, direction);

            let hit = self.other.raycast_first(&sample);
            if let Some(hit) = hit {
                if sample.direction.dot(&hit.face_normal) > 0.0 {
                    back_votes += 1;
                }
                min_distance = min_distance.min(hit.distance);
                if min_distance <= touching {
                    return if hit.face_normal.dot(&normal) > 0.0 {
                        Side::CoplanarAligned
                    } else {
                        Side::CoplanarOpposite
                    };
                }
            }

            let front_votes = i + 1 - back_votes;
            if 2 * back_votes > samples || 2 * front_votes > samples {
                break;
            }
        }

        if 2 * back_votes > samples {
            Side::Back
        } else {
            Side::Front
        }
    }
}
