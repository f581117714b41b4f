// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Attribute-buffer geometry container
//!
//! Mirrors the shape of a render-side buffer geometry: one float array per
//! attribute with a fixed item size, an optional triangle index and
//! material group ranges. The standard attributes are typed fields; anything
//! else goes through [`GeometryBuffer::extras`].

use crate::error::{CsgError, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an attribute slot of a [`GeometryBuffer`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeName {
    Position,
    Normal,
    Uv,
    Tangent,
    Extra(String),
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeName::Position => write!(f, "position"),
            AttributeName::Normal => write!(f, "normal"),
            AttributeName::Uv => write!(f, "uv"),
            AttributeName::Tangent => write!(f, "tangent"),
            AttributeName::Extra(name) => write!(f, "{name}"),
        }
    }
}

/// Ordered list of `(name, item_size)` pairs describing a buffer's layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema(pub Vec<(AttributeName, usize)>);

impl AttributeSchema {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AttributeName, usize)> {
        self.0.iter()
    }
}

impl fmt::Display for AttributeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, size)| format!("{name}:{size}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Flat float array with a fixed item size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeArray {
    pub item_size: usize,
    pub data: Vec<f32>,
}

impl AttributeArray {
    pub fn new(item_size: usize, data: Vec<f32>) -> Self {
        Self { item_size, data }
    }

    pub fn with_capacity(item_size: usize, items: usize) -> Self {
        Self {
            item_size,
            data: Vec::with_capacity(item_size * items),
        }
    }

    /// Number of items (vertices)
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    /// Components of one item
    pub fn item(&self, index: usize) -> &[f32] {
        let start = index * self.item_size;
        &self.data[start..start + self.item_size]
    }

    pub fn push(&mut self, item: &[f32]) {
        debug_assert_eq!(item.len(), self.item_size);
        self.data.extend_from_slice(item);
    }

    /// Item interpreted as a point (first three components)
    pub fn point(&self, index: usize) -> Point3<f64> {
        let item = self.item(index);
        Point3::new(item[0] as f64, item[1] as f64, item[2] as f64)
    }
}

/// Attribute outside the standard set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
    pub array: AttributeArray,
}

/// Range of index elements rendered with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRange {
    /// First index element (three per triangle)
    pub start: usize,
    /// Number of index elements
    pub count: usize,
    pub material_index: usize,
}

/// Triangle geometry in attribute-buffer form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryBuffer {
    pub position: AttributeArray,
    pub normal: Option<AttributeArray>,
    pub uv: Option<AttributeArray>,
    pub tangent: Option<AttributeArray>,
    pub extras: Vec<NamedAttribute>,
    pub index: Option<Vec<u32>>,
    pub groups: Vec<GroupRange>,
}

impl GeometryBuffer {
    /// Create a non-indexed buffer from flat positions
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self {
            position: AttributeArray::new(3, positions),
            normal: None,
            uv: None,
            tangent: None,
            extras: Vec::new(),
            index: None,
            groups: Vec::new(),
        }
    }

    /// Empty buffer laid out according to a schema
    pub fn with_schema(schema: &AttributeSchema) -> Self {
        let mut buffer = Self::from_positions(Vec::new());
        for (name, item_size) in schema.iter() {
            let array = AttributeArray::new(*item_size, Vec::new());
            buffer.set_attribute(name.clone(), array);
        }
        buffer
    }

    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normal = Some(AttributeArray::new(3, normals));
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uv = Some(AttributeArray::new(2, uvs));
        self
    }

    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn add_group(&mut self, start: usize, count: usize, material_index: usize) {
        self.groups.push(GroupRange {
            start,
            count,
            material_index,
        });
    }

    /// Replace or insert an attribute by name
    pub fn set_attribute(&mut self, name: AttributeName, array: AttributeArray) {
        match name {
            AttributeName::Position => self.position = array,
            AttributeName::Normal => self.normal = Some(array),
            AttributeName::Uv => self.uv = Some(array),
            AttributeName::Tangent => self.tangent = Some(array),
            AttributeName::Extra(name) => {
                if let Some(existing) = self.extras.iter_mut().find(|a| a.name == name) {
                    existing.array = array;
                } else {
                    self.extras.push(NamedAttribute { name, array });
                }
            }
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &AttributeName) -> Option<&AttributeArray> {
        match name {
            AttributeName::Position => Some(&self.position),
            AttributeName::Normal => self.normal.as_ref(),
            AttributeName::Uv => self.uv.as_ref(),
            AttributeName::Tangent => self.tangent.as_ref(),
            AttributeName::Extra(name) => {
                self.extras.iter().find(|a| &a.name == name).map(|a| &a.array)
            }
        }
    }

    /// All present attributes in canonical order
    pub fn attributes(&self) -> Vec<(AttributeName, &AttributeArray)> {
        let mut out = vec![(AttributeName::Position, &self.position)];
        if let Some(normal) = &self.normal {
            out.push((AttributeName::Normal, normal));
        }
        if let Some(uv) = &self.uv {
            out.push((AttributeName::Uv, uv));
        }
        if let Some(tangent) = &self.tangent {
            out.push((AttributeName::Tangent, tangent));
        }
        for extra in &self.extras {
            out.push((AttributeName::Extra(extra.name.clone()), &extra.array));
        }
        out
    }

    /// Layout used to check that two operands can be combined.
    ///
    /// Extras are sorted by name so declaration order does not matter.
    pub fn schema(&self) -> AttributeSchema {
        let mut standard = Vec::new();
        let mut extras = Vec::new();
        for (name, array) in self.attributes() {
            match name {
                AttributeName::Extra(_) => extras.push((name, array.item_size)),
                _ => standard.push((name, array.item_size)),
            }
        }
        extras.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        standard.extend(extras);
        AttributeSchema(standard)
    }

    pub fn vertex_count(&self) -> usize {
        self.position.count()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.index {
            Some(index) => index.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Vertex indices of one triangle, resolving the optional index buffer
    pub fn triangle_indices(&self, triangle: usize) -> [usize; 3] {
        let base = triangle * 3;
        match &self.index {
            Some(index) => [
                index[base] as usize,
                index[base + 1] as usize,
                index[base + 2] as usize,
            ],
            None => [base, base + 1, base + 2],
        }
    }

    /// Check sizes, counts and index ranges
    pub fn validate(&self) -> Result<()> {
        if self.position.item_size != 3 {
            return Err(CsgError::MissingPosition);
        }

        let vertex_count = self.vertex_count();
        for (name, array) in self.attributes() {
            if array.item_size == 0 || array.data.len() % array.item_size != 0 {
                return Err(CsgError::InvalidAttribute {
                    name: name.to_string(),
                    reason: format!(
                        "length {} is not a multiple of item size {}",
                        array.data.len(),
                        array.item_size
                    ),
                });
            }
            if array.count() != vertex_count {
                return Err(CsgError::InvalidAttribute {
                    name: name.to_string(),
                    reason: format!("{} items for {} vertices", array.count(), vertex_count),
                });
            }
        }

        if let Some(index) = &self.index {
            if index.len() % 3 != 0 {
                return Err(CsgError::InvalidAttribute {
                    name: "index".to_string(),
                    reason: format!("length {} is not a multiple of 3", index.len()),
                });
            }
            if let Some(&bad) = index.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(CsgError::InvalidAttribute {
                    name: "index".to_string(),
                    reason: format!("index {bad} out of range for {vertex_count} vertices"),
                });
            }
        } else if vertex_count % 3 != 0 {
            return Err(CsgError::InvalidAttribute {
                name: "position".to_string(),
                reason: format!("{vertex_count} vertices do not form whole triangles"),
            });
        }

        Ok(())
    }

    /// Expand an indexed buffer so every triangle owns three vertices
    pub fn to_non_indexed(&self) -> GeometryBuffer {
        if self.index.is_none() {
            return self.clone();
        }

        let mut out = GeometryBuffer::with_schema(&self.schema());
        out.groups = self.groups.clone();
        for (name, array) in self.attributes() {
            let mut expanded =
                AttributeArray::with_capacity(array.item_size, self.triangle_count() * 3);
            for triangle in 0..self.triangle_count() {
                for vertex in self.triangle_indices(triangle) {
                    expanded.push(array.item(vertex));
                }
            }
            out.set_attribute(name, expanded);
        }
        out
    }
}
