// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Attribute interpolation and result assembly
//!
//! Surviving fragments are interpolated from their source triangle's corners,
//! moved into world space and appended to per-material-group buffers. The
//! buffers are cleared, never reallocated, between evaluations.

use super::buffer::{AttributeArray, AttributeName, AttributeSchema, GeometryBuffer};
use super::robust_predicates::is_degenerate;
use crate::config::Tolerances;
use crate::utils::math::{is_mirroring, linear_part, normal_matrix};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// One growable array per attribute per material group
#[derive(Debug, Clone, Default)]
pub struct TypedAttributeData {
    schema: Vec<(AttributeName, usize)>,
    groups: Vec<Vec<AttributeArray>>,
}

impl TypedAttributeData {
    pub fn new(schema: &AttributeSchema) -> Self {
        let mut data = Self::default();
        data.initialize(schema);
        data
    }

    /// Adopt a schema. Buffers of an unchanged schema keep their capacity.
    pub fn initialize(&mut self, schema: &AttributeSchema) {
        if self.schema != schema.0 {
            self.schema = schema.0.clone();
            self.groups.clear();
        }
        self.clear();
    }

    /// Empty every buffer, keeping allocations
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            for array in group.iter_mut() {
                array.data.clear();
            }
        }
    }

    pub fn schema(&self) -> &[(AttributeName, usize)] {
        &self.schema
    }

    /// Schema together with the buffers of a group, creating empty groups
    /// up to it
    pub fn group_mut(
        &mut self,
        group: usize,
    ) -> (&[(AttributeName, usize)], &mut [AttributeArray]) {
        while self.groups.len() <= group {
            let arrays = self
                .schema
                .iter()
                .map(|(_, item_size)| AttributeArray::new(*item_size, Vec::new()))
                .collect();
            self.groups.push(arrays);
        }
        (&self.schema, &mut self.groups[group])
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Vertices stored in a group
    pub fn vertex_count(&self, group: usize) -> usize {
        self.groups
            .get(group)
            .and_then(|arrays| arrays.first())
            .map_or(0, AttributeArray::count)
    }
}

/// A source triangle with the transform of the brush that owns it
pub struct SourceTriangle<'a> {
    pub geometry: &'a GeometryBuffer,
    pub vertices: [usize; 3],
    pub frame: &'a WorldFrame,
}

/// World transform of a brush with its derived normal transforms
#[derive(Debug, Clone)]
pub struct WorldFrame {
    pub matrix: Matrix4<f64>,
    pub normal_matrix: Matrix3<f64>,
    pub linear: Matrix3<f64>,
    pub mirrored: bool,
}

impl WorldFrame {
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self {
            normal_matrix: normal_matrix(&matrix),
            linear: linear_part(&matrix),
            mirrored: is_mirroring(&matrix),
            matrix,
        }
    }
}

/// Collects the output of one boolean operation
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    data: TypedAttributeData,
    tolerances: Tolerances,
    use_groups: bool,
    value: Vec<f64>,
    packed: Vec<f32>,
}

impl ResultAssembler {
    pub fn new(schema: &AttributeSchema, tolerances: Tolerances, use_groups: bool) -> Self {
        Self {
            data: TypedAttributeData::new(schema),
            tolerances,
            use_groups,
            value: Vec::new(),
            packed: Vec::new(),
        }
    }

    /// Prepare for a new evaluation, keeping buffer capacity
    pub fn reset(&mut self, schema: &AttributeSchema, tolerances: Tolerances, use_groups: bool) {
        self.data.initialize(schema);
        self.tolerances = tolerances;
        self.use_groups = use_groups;
    }

    pub fn data(&self) -> &TypedAttributeData {
        &self.data
    }

    /// Append one triangle whose corners are given as barycentric coordinates
    /// of `source`. Returns false when the world-space result is degenerate.
    pub fn append(
        &mut self,
        group: usize,
        source: &SourceTriangle<'_>,
        barycentric: &[Vector3<f64>; 3],
        invert: bool,
    ) -> bool {
        let frame = source.frame;
        let corners: [Point3<f64>; 3] = [0, 1, 2].map(|i| {
            let local = interpolate_point(source, &barycentric[i]);
            frame.matrix.transform_point(&local)
        });
        if is_degenerate(
            &corners[0],
            &corners[1],
            &corners[2],
            self.tolerances.degenerate_edge,
            self.tolerances.degenerate_angle,
        ) {
            return false;
        }

        let order: [usize; 3] = if invert != frame.mirrored { [0, 2, 1] } else { [0, 1, 2] };
        let group = if self.use_groups { group } else { 0 };

        let (schema, arrays) = self.data.group_mut(group);
        for ((name, item_size), array) in schema.iter().zip(arrays.iter_mut()) {
            let Some(attribute) = source.geometry.attribute(name) else {
                continue;
            };
            for &i in &order {
                interpolate(
                    attribute,
                    &source.vertices,
                    &barycentric[i],
                    *item_size,
                    &mut self.value,
                );
                transform_attribute(name, &mut self.value, frame, invert);
                self.packed.clear();
                self.packed.extend(self.value.iter().map(|v| *v as f32));
                array.push(&self.packed);
            }
        }

        true
    }

    /// Package the collected groups into one non-indexed buffer. Group ranges
    /// are only recorded when groups are in use.
    pub fn finish(&self) -> GeometryBuffer {
        let schema = AttributeSchema(self.data.schema().to_vec());
        let mut out = GeometryBuffer::with_schema(&schema);
        let mut arrays: Vec<AttributeArray> = schema
            .iter()
            .map(|(_, item_size)| AttributeArray::new(*item_size, Vec::new()))
            .collect();

        let mut start = 0;
        for (group, group_arrays) in self.data.groups.iter().enumerate() {
            let count = self.data.vertex_count(group);
            if count == 0 {
                continue;
            }
            for (target, source) in arrays.iter_mut().zip(group_arrays) {
                target.data.extend_from_slice(&source.data);
            }
            if self.use_groups {
                out.add_group(start, count, group);
            }
            start += count;
        }

        for ((name, _), array) in schema.iter().zip(arrays) {
            out.set_attribute(name.clone(), array);
        }
        out
    }

    /// Triangles appended so far
    pub fn triangle_count(&self) -> usize {
        (0..self.data.group_count())
            .map(|g| self.data.vertex_count(g) / 3)
            .sum()
    }
}

fn interpolate_point(source: &SourceTriangle<'_>, bary: &Vector3<f64>) -> Point3<f64> {
    let position = &source.geometry.position;
    let [a, b, c] = source.vertices.map(|v| position.point(v).coords);
    Point3::from(a * bary.x + b * bary.y + c * bary.z)
}

fn interpolate(
    attribute: &AttributeArray,
    vertices: &[usize; 3],
    bary: &Vector3<f64>,
    item_size: usize,
    out: &mut Vec<f64>,
) {
    let [a, b, c] = vertices.map(|v| attribute.item(v));
    out.clear();
    out.extend(
        (0..item_size).map(|k| a[k] as f64 * bary.x + b[k] as f64 * bary.y + c[k] as f64 * bary.z),
    );
}

/// Carry an interpolated attribute value into world space
fn transform_attribute(name: &AttributeName, value: &mut [f64], frame: &WorldFrame, invert: bool) {
    match name {
        AttributeName::Position => {
            let p = Point3::from(read_xyz(value));
            write_xyz(value, &frame.matrix.transform_point(&p).coords);
        }
        AttributeName::Normal if value.len() >= 3 => {
            let n = frame.normal_matrix * read_xyz(value);
            let n = n.try_normalize(f64::MIN_POSITIVE).unwrap_or(n);
            write_xyz(value, &if invert { -n } else { n });
        }
        AttributeName::Tangent if value.len() >= 3 => {
            let t = frame.linear * read_xyz(value);
            let t = t.try_normalize(f64::MIN_POSITIVE).unwrap_or(t);
            write_xyz(value, &if invert { -t } else { t });
        }
        _ => {}
    }
}

fn read_xyz(value: &[f64]) -> Vector3<f64> {
    Vector3::new(value[0], value[1], value[2])
}

fn write_xyz(value: &mut [f64], v: &Vector3<f64>) {
    value[..3].copy_from_slice(v.as_slice());
}
