// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Brush cache lifecycle and connectivity reporting

use anyhow::Result;
use nalgebra::{Matrix4, Vector3};
use polyframe_csg::{
    analyze, prepare_all, BooleanOp, Brush, CsgConfig, CsgError, Evaluator, GeometryBuffer,
    Primitive,
};

/// Unit cube sharing its eight corners between faces
fn indexed_cube() -> GeometryBuffer {
    let mut positions = Vec::new();
    for i in 0..8 {
        for axis in 0..3 {
            positions.push(if i & (1 << axis) != 0 { 0.5 } else { -0.5 });
        }
    }
    GeometryBuffer::from_positions(positions).with_index(vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ])
}

#[test]
fn test_transform_change_marks_dirty() -> Result<()> {
    let config = CsgConfig::default();
    let mut brush = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    assert!(brush.is_dirty());
    assert!(brush.cache().is_none());

    brush.prepare(&config)?;
    assert!(!brush.is_dirty());
    assert!(brush.is_prepared(&config));

    let moved = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
    brush.set_transform(moved);
    assert!(brush.is_dirty());
    assert!(!brush.is_prepared(&config));

    brush.prepare(&config)?;
    assert!(!brush.is_dirty());
    assert_eq!(brush.cache().map(|cache| cache.transform), Some(moved));

    // same transform again is not a change
    brush.set_transform(moved);
    assert!(!brush.is_dirty());
    Ok(())
}

#[test]
fn test_mark_clean_records_baseline() -> Result<()> {
    let mut brush = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    brush.prepare(&CsgConfig::default())?;

    brush.set_transform(Matrix4::new_scaling(2.0));
    assert!(brush.is_dirty());
    brush.mark_clean();
    assert!(!brush.is_dirty());
    assert_eq!(brush.cache().map(|cache| cache.transform), Some(Matrix4::new_scaling(2.0)));
    Ok(())
}

#[test]
fn test_mark_clean_keeps_geometry_edits_pending() -> Result<()> {
    let config = CsgConfig::default();
    let mut a = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    let mut b = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?
        .with_transform(Matrix4::new_translation(&Vector3::new(0.5, 0.0, 0.0)));
    a.prepare(&config)?;
    b.prepare(&config)?;

    a.geometry_mut().index = Some(vec![0, 1, 2]);
    a.mark_clean();
    assert!(a.is_dirty());
    assert!(!a.is_prepared(&config));

    let mut evaluator = Evaluator::new(config.clone());
    assert!(matches!(
        evaluator.evaluate_prepared(&a, &b, BooleanOp::Union),
        Err(CsgError::BrushNotPrepared)
    ));

    // an invalid edit is still caught once prepare runs
    a.geometry_mut().position.data.pop();
    a.mark_clean();
    assert!(matches!(a.prepare(&config), Err(CsgError::InvalidAttribute { .. })));
    Ok(())
}

#[test]
fn test_geometry_edit_marks_dirty() -> Result<()> {
    let config = CsgConfig::default();
    let mut brush = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    brush.prepare(&config)?;

    brush.geometry_mut().position.data[0] = -0.75;
    assert!(brush.is_dirty());
    brush.prepare(&config)?;
    assert!(!brush.is_dirty());
    assert_eq!(brush.cache().map(|cache| cache.triangles()[0].a.x), Some(-0.75));
    Ok(())
}

#[test]
fn test_invalid_edit_is_reported_on_prepare() -> Result<()> {
    let mut brush = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    brush.geometry_mut().position.data.pop();
    assert!(matches!(
        brush.prepare(&CsgConfig::default()),
        Err(CsgError::InvalidAttribute { .. })
    ));
    Ok(())
}

#[test]
fn test_sequential_index_is_generated_once() -> Result<()> {
    let mut brush = Brush::new(Primitive::sphere(1.0, 12).to_buffer())?;
    let vertices = brush.geometry().vertex_count();
    brush.prepare(&CsgConfig::default())?;

    let index = brush.geometry().index.clone().unwrap_or_default();
    assert_eq!(index.len(), vertices);
    assert!(index.iter().enumerate().all(|(i, &v)| v as usize == i));
    // vertices are not merged
    assert_eq!(brush.geometry().vertex_count(), vertices);
    Ok(())
}

#[test]
fn test_indexed_input_is_kept() -> Result<()> {
    let buffer = indexed_cube();
    let index = buffer.index.clone();
    let mut brush = Brush::new(buffer)?;
    brush.prepare(&CsgConfig::default())?;

    assert_eq!(brush.geometry().index, index);
    assert_eq!(brush.triangle_count(), 12);
    assert_eq!(brush.is_manifold(), Some(true));
    assert_eq!(brush.unmatched_edge_count(), Some(0));
    Ok(())
}

#[test]
fn test_indexed_and_flat_operands_combine() -> Result<()> {
    let mut a = Brush::new(indexed_cube())?;
    let mut b = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?
        .with_transform(Matrix4::new_translation(&Vector3::new(0.5, 0.0, 0.0)));
    // flat cube carries normals and uvs the indexed one does not
    b.geometry_mut().normal = None;
    b.geometry_mut().uv = None;

    let result = Evaluator::default().evaluate(&mut a, &mut b, BooleanOp::Subtract)?;
    assert!(!result.is_indexed());
    assert!(result.triangle_count() > 0);
    Ok(())
}

#[test]
fn test_flattened_copy_evaluates_alike() -> Result<()> {
    let indexed = indexed_cube();
    let flat = indexed.to_non_indexed();
    assert!(!flat.is_indexed());
    assert_eq!(flat.vertex_count(), 36);

    let offset = Matrix4::new_translation(&Vector3::new(0.5, 0.25, 0.0));
    let mut cutter = Brush::new(indexed.clone())?.with_transform(offset);
    let mut a = Brush::new(indexed)?;
    let from_indexed = Evaluator::default().evaluate(&mut a, &mut cutter, BooleanOp::Subtract)?;

    let mut cutter = Brush::new(flat.clone())?.with_transform(offset);
    let mut a = Brush::new(flat)?;
    let from_flat = Evaluator::default().evaluate(&mut a, &mut cutter, BooleanOp::Subtract)?;

    let volume = |buffer: &GeometryBuffer| analyze(buffer).volume;
    assert!((volume(&from_indexed) - 0.625).abs() < 1e-6);
    assert!((volume(&from_flat) - 0.625).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_open_mesh_reports_boundary() -> Result<()> {
    let mut brush = Brush::new(Primitive::quad(1.0).to_buffer())?;
    assert_eq!(brush.is_manifold(), None);
    assert_eq!(brush.unmatched_edge_count(), None);

    brush.prepare(&CsgConfig::default())?;
    assert_eq!(brush.is_manifold(), Some(false));
    assert_eq!(brush.unmatched_edge_count(), Some(4));
    Ok(())
}

#[test]
fn test_config_change_rebuilds() -> Result<()> {
    let mut brush = Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?;
    brush.prepare(&CsgConfig::default())?;

    let coarse = CsgConfig {
        match_disjoint_edges: false,
        ..CsgConfig::default()
    };
    assert!(!brush.is_prepared(&coarse));
    brush.prepare(&coarse)?;
    assert!(brush.is_prepared(&coarse));
    assert!(!brush.is_prepared(&CsgConfig::default()));
    Ok(())
}

#[test]
fn test_invalid_buffers_are_rejected() {
    let bad_index = indexed_cube().with_index(vec![0, 1, 42]);
    assert!(matches!(
        Brush::new(bad_index),
        Err(CsgError::InvalidAttribute { .. })
    ));

    let mut flat = GeometryBuffer::from_positions(vec![0.0; 6]);
    flat.position.item_size = 2;
    assert!(matches!(Brush::new(flat), Err(CsgError::MissingPosition)));
}

#[test]
fn test_read_only_path_needs_prepared_brushes() -> Result<()> {
    let config = CsgConfig::default();
    let mut brushes = vec![
        Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?,
        Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())?
            .with_transform(Matrix4::new_translation(&Vector3::new(0.25, 0.0, 0.0))),
    ];

    let mut evaluator = Evaluator::new(config.clone());
    assert!(matches!(
        evaluator.evaluate_prepared(&brushes[0], &brushes[1], BooleanOp::Union),
        Err(CsgError::BrushNotPrepared)
    ));

    prepare_all(&mut brushes, &config)?;
    let result = evaluator.evaluate_prepared(&brushes[0], &brushes[1], BooleanOp::Union)?;
    assert!(result.triangle_count() > 0);

    brushes[1].set_transform(Matrix4::identity());
    assert!(matches!(
        evaluator.evaluate_prepared(&brushes[0], &brushes[1], BooleanOp::Union),
        Err(CsgError::BrushNotPrepared)
    ));
    Ok(())
}
