// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Attribute interpolation, transforms and material groups in boolean output

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Matrix4, Vector3};
use polyframe_csg::{
    AttributeArray, AttributeName, BooleanOp, Brush, CsgConfig, CsgError, Evaluator, GeometryBuffer,
    Primitive,
};

fn cube_brush(buffer: GeometryBuffer, offset: Vector3<f64>) -> Result<Brush> {
    Ok(Brush::new(buffer)?.with_transform(Matrix4::new_translation(&offset)))
}

fn vec3(item: &[f32]) -> Vector3<f64> {
    Vector3::new(item[0] as f64, item[1] as f64, item[2] as f64)
}

#[test]
fn test_uvs_follow_split_positions() -> Result<()> {
    // uv is linear in position on the quad, so interpolation must reproduce it
    let mut quad = Brush::new(Primitive::quad(2.0).to_buffer())?;
    let mut cutter = cube_brush(
        Primitive::cube(1.0, Vector3::zeros()).to_buffer(),
        Vector3::new(0.2, 0.1, 0.0),
    )?;

    let result = Evaluator::default().evaluate(&mut quad, &mut cutter, BooleanOp::HollowSubtract)?;
    assert!(result.triangle_count() > 2);

    let uv = result.uv.as_ref().expect("uv carried through");
    for v in 0..result.vertex_count() {
        let p = result.position.point(v);
        let item = uv.item(v);
        assert_relative_eq!(item[0] as f64, (p.x + 1.0) / 2.0, epsilon = 1e-5);
        assert_relative_eq!(item[1] as f64, (p.y + 1.0) / 2.0, epsilon = 1e-5);
    }
    Ok(())
}

#[test]
fn test_inverted_fragments_flip_normals_and_tangents() -> Result<()> {
    let with_tangents = |buffer: GeometryBuffer| {
        let count = buffer.vertex_count();
        let mut buffer = buffer;
        buffer.set_attribute(
            AttributeName::Tangent,
            AttributeArray::new(4, [1.0, 0.0, 0.0, -1.0].repeat(count)),
        );
        buffer
    };
    let mut a = Brush::new(with_tangents(Primitive::cube(2.0, Vector3::zeros()).to_buffer()))?;
    let mut b = Brush::new(with_tangents(Primitive::sphere(0.5, 16).to_buffer()))?;

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Subtract)?;
    let normals = result.normal.as_ref().expect("normals");
    let tangents = result.tangent.as_ref().expect("tangents");

    // the cube comes first and is untouched
    for v in 0..36 {
        assert_eq!(tangents.item(v), &[1.0, 0.0, 0.0, -1.0]);
    }
    // the cavity is the sphere turned inside out; handedness is kept
    for v in 36..result.vertex_count() {
        let p = result.position.point(v).coords;
        assert!(vec3(normals.item(v)).dot(&p) < 0.0);
        assert_eq!(tangents.item(v), &[-1.0, 0.0, 0.0, -1.0]);
    }
    Ok(())
}

#[test]
fn test_normals_follow_rotation() -> Result<()> {
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    let rotation = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0))
        * Matrix4::new_rotation(Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
    let mut b =
        Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?.with_transform(rotation);

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Union)?;
    let normals = result.normal.as_ref().expect("normals");
    let original = Primitive::cube(1.0, Vector3::zeros()).to_buffer();
    let local = original.normal.as_ref().expect("normals");

    // the second cube's first face (+x) now points along +y
    let emitted: Vec<Vector3<f64>> = (36..72).map(|v| vec3(normals.item(v))).collect();
    let expected = vec3(local.item(0));
    let rotated = Vector3::new(-expected.y, expected.x, expected.z);
    assert!(emitted.iter().any(|n| (n - rotated).norm() < 1e-6));
    assert!(emitted.iter().all(|n| (n.norm() - 1.0).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_extra_attributes_are_interpolated() -> Result<()> {
    let with_height = |buffer: GeometryBuffer| {
        let heights: Vec<f32> = (0..buffer.vertex_count())
            .map(|v| buffer.position.point(v).z as f32)
            .collect();
        let mut buffer = buffer;
        buffer.set_attribute(
            AttributeName::Extra("height".into()),
            AttributeArray::new(1, heights),
        );
        buffer
    };
    let mut a = Brush::new(with_height(Primitive::cube(1.0, Vector3::zeros()).to_buffer()))?;
    let mut b = cube_brush(
        with_height(Primitive::cube(1.0, Vector3::zeros()).to_buffer()),
        Vector3::new(0.3, 0.2, 0.1),
    )?;

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Subtract)?;
    assert_eq!(result.schema(), a.geometry().schema());

    let height = result
        .attribute(&AttributeName::Extra("height".into()))
        .expect("extra attribute carried through");
    // heights are local to each operand, b sits 0.1 higher in world space
    for v in 0..result.vertex_count() {
        let z = result.position.point(v).z;
        let h = height.item(v)[0] as f64;
        assert!((h - z).abs() < 1e-5 || (h - (z - 0.1)).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn test_mismatched_schemas_fail_up_front() -> Result<()> {
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    let mut tangent_buffer = Primitive::cube(1.0, Vector3::zeros()).to_buffer();
    tangent_buffer.set_attribute(AttributeName::Tangent, AttributeArray::new(4, vec![0.0; 36 * 4]));
    let mut b = Brush::new(tangent_buffer)?;

    match Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Union) {
        Err(CsgError::InputMismatch { expected, found }) => {
            assert!(!expected.contains("tangent"));
            assert!(found.contains("tangent"));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_groups_are_offset_for_second_operand() -> Result<()> {
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer_with_groups())?;
    let mut b = cube_brush(
        Primitive::cube(1.0, Vector3::zeros()).to_buffer_with_groups(),
        Vector3::new(3.0, 0.0, 0.0),
    )?;

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Union)?;
    assert_eq!(result.groups.len(), 12);
    for (i, group) in result.groups.iter().enumerate() {
        assert_eq!(group.material_index, i);
        assert_eq!(group.start, i * 6);
        assert_eq!(group.count, 6);
    }
    Ok(())
}

#[test]
fn test_groups_disabled() -> Result<()> {
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer_with_groups())?;
    let mut b = cube_brush(
        Primitive::cube(1.0, Vector3::zeros()).to_buffer_with_groups(),
        Vector3::new(0.5, 0.0, 0.0),
    )?;

    let config = CsgConfig::default().with_groups(false);
    let result = Evaluator::new(config).evaluate(&mut a, &mut b, BooleanOp::Union)?;
    assert!(result.groups.is_empty());
    assert!(result.triangle_count() > 0);
    Ok(())
}

#[test]
fn test_empty_result_keeps_schema() -> Result<()> {
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    let mut b = cube_brush(
        Primitive::cube(1.0, Vector3::zeros()).to_buffer(),
        Vector3::new(4.0, 0.0, 0.0),
    )?;

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Intersect)?;
    assert_eq!(result.triangle_count(), 0);
    assert_eq!(result.schema(), a.geometry().schema());
    assert!(result.groups.is_empty());
    Ok(())
}
