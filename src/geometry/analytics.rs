// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::halfedge::HalfEdgeMap;
use super::robust_predicates::oriented_volume;
use super::triangle::Triangle;
use super::{BoundingBox, GeometryBuffer};
use crate::config::Tolerances;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Signed enclosed volume (positive for outward-facing closed meshes)
    pub volume: f64,
    /// Total surface area
    pub surface_area: f64,
    pub bbox: BoundingBox,
    /// Area-weighted surface centroid
    pub centroid: Point3<f64>,
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Every edge is matched, counting collinear T-junction edges
    pub is_watertight: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: BoundingBox::empty(),
            centroid: Point3::origin(),
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }
}

impl fmt::Display for GeometryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Volume:        {:>12.6}", self.volume)?;
        writeln!(f, "Surface area:  {:>12.6}", self.surface_area)?;
        if !self.bbox.is_empty() {
            let (min, max, size) = (self.bbox.min, self.bbox.max, self.bbox.size());
            writeln!(
                f,
                "Bounds:        ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
            writeln!(f, "Size:          {:.3} x {:.3} x {:.3}", size.x, size.y, size.z)?;
        }
        writeln!(f, "Vertices:      {:>12}", self.vertex_count)?;
        writeln!(f, "Triangles:     {:>12}", self.triangle_count)?;
        write!(
            f,
            "Watertight:    {:>12}",
            if self.is_watertight { "yes" } else { "no" }
        )
    }
}

/// Analyze geometry with default tolerances
pub fn analyze(buffer: &GeometryBuffer) -> GeometryStats {
    analyze_with(buffer, &Tolerances::default())
}

/// Analyze geometry and compute statistics
pub fn analyze_with(buffer: &GeometryBuffer, tolerances: &Tolerances) -> GeometryStats {
    let vertex_count = buffer.vertex_count();
    let triangle_count = buffer.triangle_count();

    if vertex_count == 0 || triangle_count == 0 {
        return GeometryStats::empty();
    }

    let triangles: Vec<Triangle> = (0..triangle_count)
        .map(|t| {
            let [a, b, c] = buffer.triangle_indices(t);
            Triangle::new(
                buffer.position.point(a),
                buffer.position.point(b),
                buffer.position.point(c),
            )
        })
        .collect();

    let origin = Point3::origin();
    let mut volume = 0.0;
    let mut surface_area = 0.0;
    let mut weighted = nalgebra::Vector3::zeros();
    let mut bbox = BoundingBox::empty();
    for triangle in &triangles {
        volume += oriented_volume(&triangle.a, &triangle.b, &triangle.c, &origin);
        let area = triangle.area();
        surface_area += area;
        weighted += triangle.midpoint().coords * area;
        for point in triangle.points() {
            bbox.expand_to_include(&point);
        }
    }

    let centroid = if surface_area > 0.0 {
        Point3::from(weighted / surface_area)
    } else {
        Point3::origin()
    };
    let is_watertight = HalfEdgeMap::build(&triangles, tolerances, true).is_manifold();

    GeometryStats {
        // oriented_volume is six times the tetrahedron volume, and (a, b, c, origin)
        // is negative for origin behind a counter-clockwise face
        volume: -volume / 6.0,
        surface_area,
        bbox,
        centroid,
        vertex_count,
        triangle_count,
        is_watertight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_cube_stats() {
        let stats = analyze(&Primitive::cube(2.0, Vector3::new(1.0, 0.0, 0.0)).to_buffer());
        assert_relative_eq!(stats.volume, 8.0, epsilon = 1e-5);
        assert_relative_eq!(stats.surface_area, 24.0, epsilon = 1e-5);
        assert_relative_eq!(stats.centroid.x, 1.0, epsilon = 1e-5);
        assert_eq!(stats.triangle_count, 12);
        assert!(stats.is_watertight);
    }

    #[test]
    fn test_sphere_volume_approaches_analytic() {
        let stats = analyze(&Primitive::sphere(1.0, 48).to_buffer());
        let analytic = 4.0 / 3.0 * std::f64::consts::PI;
        assert!(stats.volume > 0.95 * analytic && stats.volume < analytic);
        assert!(stats.is_watertight);
    }

    #[test]
    fn test_open_quad_is_not_watertight() {
        let stats = analyze(&Primitive::quad(1.0).to_buffer());
        assert!(!stats.is_watertight);
        assert_relative_eq!(stats.volume, 0.0, epsilon = 1e-12);
        assert!(stats.to_string().contains("Watertight"));
    }

    #[test]
    fn test_empty_buffer() {
        let stats = analyze(&GeometryBuffer::from_positions(Vec::new()));
        assert_eq!(stats.triangle_count, 0);
        assert!(stats.bbox.is_empty());
    }
}
