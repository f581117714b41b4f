// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Every primitive is emitted as a non-indexed buffer carrying position,
//! normal and uv, wound counter-clockwise when seen from outside.

use super::GeometryBuffer;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cube { size: f64, center: Vector3<f64> },
    Sphere { radius: f64, segments: u32 },
    /// Single-sided square in the z = 0 plane facing +z
    Quad { size: f64 },
}

impl Primitive {
    pub fn cube(size: f64, center: Vector3<f64>) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(radius: f64, segments: u32) -> Self {
        let segments = if segments > 0 { segments.max(3) } else { 32 };
        Self::Sphere { radius, segments }
    }

    pub fn quad(size: f64) -> Self {
        Self::Quad { size }
    }

    pub fn to_buffer(&self) -> GeometryBuffer {
        let mut builder = Builder::default();
        match self {
            Self::Cube { size, center } => generate_cube(&mut builder, *size, *center),
            Self::Sphere { radius, segments } => generate_sphere(&mut builder, *radius, *segments),
            Self::Quad { size } => generate_quad(&mut builder, *size),
        }
        builder.finish()
    }

    /// Same geometry with material groups attached. Cube faces get one
    /// material each (0..6); other primitives share material 0.
    pub fn to_buffer_with_groups(&self) -> GeometryBuffer {
        let mut buffer = self.to_buffer();
        match self {
            Self::Cube { .. } => {
                for face in 0..6 {
                    buffer.add_group(face * 6, 6, face);
                }
            }
            _ => {
                let count = buffer.vertex_count();
                buffer.add_group(0, count, 0);
            }
        }
        buffer
    }
}

#[derive(Default)]
struct Builder {
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
}

impl Builder {
    fn vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: [f64; 2]) {
        self.positions
            .extend([position.x as f32, position.y as f32, position.z as f32]);
        self.normals
            .extend([normal.x as f32, normal.y as f32, normal.z as f32]);
        self.uvs.extend([uv[0] as f32, uv[1] as f32]);
    }

    fn finish(self) -> GeometryBuffer {
        GeometryBuffer::from_positions(self.positions)
            .with_normals(self.normals)
            .with_uvs(self.uvs)
    }
}

fn generate_cube(builder: &mut Builder, size: f64, center: Vector3<f64>) {
    let h = size / 2.0;
    let x = Vector3::x();
    let y = Vector3::y();
    let z = Vector3::z();

    // (normal, u, v) with u x v = normal
    let faces = [
        (x, y, z),
        (-x, z, y),
        (y, z, x),
        (-y, x, z),
        (z, x, y),
        (-z, y, x),
    ];

    for (normal, u, v) in faces {
        let mid = Point3::from(center + normal * h);
        let corners = [
            (mid - u * h - v * h, [0.0, 0.0]),
            (mid + u * h - v * h, [1.0, 0.0]),
            (mid + u * h + v * h, [1.0, 1.0]),
            (mid - u * h + v * h, [0.0, 1.0]),
        ];
        for i in [0, 1, 2, 0, 2, 3] {
            let (position, uv) = corners[i];
            builder.vertex(position, normal, uv);
        }
    }
}

fn generate_sphere(builder: &mut Builder, radius: f64, segments: u32) {
    let slices = segments as usize;
    let stacks = (slices / 2).max(2);

    // poles are exact so the fans close without cracks
    let point = |i: usize, j: usize| -> (Point3<f64>, Vector3<f64>, [f64; 2]) {
        let v = 1.0 - i as f64 / stacks as f64;
        let u = j as f64 / slices as f64;
        let normal = if i == 0 {
            Vector3::y()
        } else if i == stacks {
            -Vector3::y()
        } else {
            let phi = PI * i as f64 / stacks as f64;
            let theta = 2.0 * PI * (j % slices) as f64 / slices as f64;
            Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
        };
        (Point3::from(normal * radius), normal, [u, v])
    };

    let mut push = |corners: [(usize, usize); 3]| {
        for (i, j) in corners {
            let (position, normal, uv) = point(i, j);
            builder.vertex(position, normal, uv);
        }
    };

    for i in 0..stacks {
        for j in 0..slices {
            if i != 0 {
                push([(i, j), (i, j + 1), (i + 1, j + 1)]);
            }
            if i + 1 != stacks {
                push([(i, j), (i + 1, j + 1), (i + 1, j)]);
            }
        }
    }
}

fn generate_quad(builder: &mut Builder, size: f64) {
    let h = size / 2.0;
    let normal = Vector3::z();
    let corners = [
        (Point3::new(-h, -h, 0.0), [0.0, 0.0]),
        (Point3::new(h, -h, 0.0), [1.0, 0.0]),
        (Point3::new(h, h, 0.0), [1.0, 1.0]),
        (Point3::new(-h, h, 0.0), [0.0, 1.0]),
    ];
    for i in [0, 1, 2, 0, 2, 3] {
        let (position, uv) = corners[i];
        builder.vertex(position, normal, uv);
    }
}
