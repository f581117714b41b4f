// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Parallel boolean evaluation using rayon
//!
//! Each job runs on its own evaluator; brushes are shared read-only, so they
//! must be prepared up front.

use super::{BooleanOp, Brush, Evaluator, GeometryBuffer};
use crate::config::CsgConfig;
use crate::error::Result;
use rayon::prelude::*;

/// Independent evaluation over two prepared brushes
#[derive(Debug, Clone)]
pub struct BatchJob<'a> {
    pub a: &'a Brush,
    pub b: &'a Brush,
    pub ops: Vec<BooleanOp>,
}

impl<'a> BatchJob<'a> {
    pub fn new(a: &'a Brush, b: &'a Brush, ops: Vec<BooleanOp>) -> Self {
        Self { a, b, ops }
    }
}

/// Evaluate jobs in parallel. Results are returned in job order; a brush that
/// is not prepared fails only its own job.
pub fn evaluate_batch(
    jobs: &[BatchJob<'_>],
    config: &CsgConfig,
) -> Vec<Result<Vec<GeometryBuffer>>> {
    jobs.par_iter()
        .map_init(
            || Evaluator::new(config.clone()),
            |evaluator, job| evaluator.evaluate_prepared_many(job.a, job.b, &job.ops),
        )
        .collect()
}

/// Prepare many brushes in parallel before a batch
pub fn prepare_all(brushes: &mut [Brush], config: &CsgConfig) -> Result<()> {
    brushes
        .par_iter_mut()
        .try_for_each(|brush| brush.prepare(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsgError;
    use crate::geometry::Primitive;
    use nalgebra::{Matrix4, Vector3};

    fn cube_at(x: f64) -> Brush {
        Brush::new(Primitive::cube(1.0, Vector3::zeros()).to_buffer())
            .unwrap()
            .with_transform(Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_batch_matches_sequential() {
        let config = CsgConfig::default();
        let mut brushes = vec![cube_at(0.0), cube_at(0.5), cube_at(3.0)];
        prepare_all(&mut brushes, &config).unwrap();

        let jobs = vec![
            BatchJob::new(&brushes[0], &brushes[1], vec![BooleanOp::Subtract, BooleanOp::Union]),
            BatchJob::new(&brushes[0], &brushes[2], vec![BooleanOp::Union]),
        ];
        let results = evaluate_batch(&jobs, &config);
        assert_eq!(results.len(), 2);

        let mut evaluator = Evaluator::new(config.clone());
        let sequential = evaluator
            .evaluate_prepared_many(
                &brushes[0],
                &brushes[1],
                &[BooleanOp::Subtract, BooleanOp::Union],
            )
            .unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &sequential);
        assert_eq!(results[1].as_ref().unwrap()[0].triangle_count(), 24);
    }

    #[test]
    fn test_unprepared_brush_fails_its_job() {
        let config = CsgConfig::default();
        let mut prepared = cube_at(0.0);
        prepared.prepare(&config).unwrap();
        let raw = cube_at(0.5);

        let jobs = vec![BatchJob::new(&prepared, &raw, vec![BooleanOp::Union])];
        let results = evaluate_batch(&jobs, &config);
        assert!(matches!(results[0], Err(CsgError::BrushNotPrepared)));
    }
}
