//! Operator stroke to momentum impulse.
//!
//! A stroke pulls the structure under its start point towards its end
//! point. The force is spread over the 3x3x3 neighbourhood of the start
//! voxel along the local image gradient, scaled so that its component along
//! the stroke matches the stroke length.

use burn::tensor::backend::Backend;
use fluidreg_core::spatial::{Point, Vector};
use fluidreg_core::VolumetricField;

use crate::error::Result;

/// Outcome of spreading one stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplatSummary {
    /// Neighbourhood voxels inside the grid.
    pub visited: usize,
    /// Voxels whose momentum changed.
    pub modified: usize,
}

/// Add the impulse of a stroke from `start` to `end` to `momentum`.
///
/// `start` and `end` are continuous indices in field axis order. Voxels with
/// a zero gradient, or a gradient orthogonal to the stroke, are skipped.
pub fn splat_impulse<B: Backend>(
    momentum: &mut [VolumetricField<B>; 3],
    gradient: &[VolumetricField<B>; 3],
    start: &Point<3>,
    end: &Point<3>,
) -> Result<SplatSummary> {
    let force: Vector<3> = *start - *end;
    let force_sq = force.dot(&force);
    let shape = gradient[0].shape();
    let center = start.round();

    let mut lo = [0usize; 3];
    let mut size = [0usize; 3];
    for k in 0..3 {
        let first = center[k].saturating_sub(1).max(0);
        let last = center[k].saturating_add(1).min(shape[k] as i64 - 1);
        if first > last {
            return Ok(SplatSummary::default());
        }
        lo[k] = first as usize;
        size[k] = (last - first + 1) as usize;
    }

    let grad_block = [
        gradient[0].read_block(lo, size)?,
        gradient[1].read_block(lo, size)?,
        gradient[2].read_block(lo, size)?,
    ];

    let count = size.iter().product::<usize>();
    let mut deltas = [vec![0.0f32; count], vec![0.0f32; count], vec![0.0f32; count]];
    let mut summary = SplatSummary {
        visited: count,
        modified: 0,
    };

    for n in 0..count {
        let g = Vector::new([
            grad_block[0][n] as f64,
            grad_block[1][n] as f64,
            grad_block[2][n] as f64,
        ]);
        let unit = match g.try_normalize() {
            Some(unit) => unit,
            None => continue,
        };
        let dot = unit.dot(&force);
        if dot == 0.0 {
            continue;
        }
        let push = unit * (force_sq / dot);
        for k in 0..3 {
            deltas[k][n] = push[k] as f32;
        }
        summary.modified += 1;
    }

    if summary.modified > 0 {
        let [d0, d1, d2] = deltas;
        momentum[0].add_block(lo, size, d0)?;
        momentum[1].add_block(lo, size, d1)?;
        momentum[2].add_block(lo, size, d2)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use fluidreg_core::FieldGeometry;

    type B = NdArray<f32>;

    fn constant(shape: [usize; 3], value: f32) -> VolumetricField<B> {
        let device = Default::default();
        VolumetricField::filled(FieldGeometry::with_shape(shape).unwrap(), value, &device)
    }

    #[test]
    fn test_splat_along_gradient() {
        let shape = [5, 5, 5];
        let gradient = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 2.0)];
        let mut momentum = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];

        // Force (0, 0, 3) along a unit gradient (0, 0, 1): push = |f|^2 / 3 = 3
        let summary = splat_impulse(
            &mut momentum,
            &gradient,
            &Point::new([2.0, 2.0, 3.0]),
            &Point::new([2.0, 2.0, 0.0]),
        )
        .unwrap();
        assert_eq!(summary.visited, 27);
        assert_eq!(summary.modified, 27);

        assert!((momentum[2].value_at([2, 2, 3]).unwrap() - 3.0).abs() < 1e-5);
        assert!((momentum[2].value_at([1, 1, 2]).unwrap() - 3.0).abs() < 1e-5);
        assert_eq!(momentum[2].value_at([2, 2, 1]).unwrap(), 0.0);
        assert_eq!(momentum[0].value_at([2, 2, 3]).unwrap(), 0.0);
    }

    #[test]
    fn test_splat_clipped_at_border() {
        let shape = [4, 4, 4];
        let gradient = [constant(shape, 1.0), constant(shape, 0.0), constant(shape, 0.0)];
        let mut momentum = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];
        let summary = splat_impulse(
            &mut momentum,
            &gradient,
            &Point::new([0.2, 0.0, 3.0]),
            &Point::new([-0.8, 0.0, 3.0]),
        )
        .unwrap();
        assert_eq!(summary.visited, 8);
        assert!((momentum[0].value_at([1, 1, 2]).unwrap() - 1.0).abs() < 1e-5);
        assert_eq!(momentum[0].value_at([2, 0, 3]).unwrap(), 0.0);
    }

    #[test]
    fn test_orthogonal_or_flat_gradient_is_skipped() {
        let shape = [3, 3, 3];
        let flat = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];
        let mut momentum = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];
        let start = Point::new([1.0, 1.0, 1.0]);
        let end = Point::new([1.0, 1.0, 0.0]);

        let summary = splat_impulse(&mut momentum, &flat, &start, &end).unwrap();
        assert_eq!(summary.modified, 0);

        let orthogonal = [constant(shape, 1.0), constant(shape, 0.0), constant(shape, 0.0)];
        let summary = splat_impulse(&mut momentum, &orthogonal, &start, &end).unwrap();
        assert_eq!(summary.modified, 0);
        assert_eq!(momentum[0].max().unwrap(), 0.0);
    }

    #[test]
    fn test_far_away_start_saturates() {
        let shape = [3, 3, 3];
        let gradient = [constant(shape, 1.0), constant(shape, 1.0), constant(shape, 1.0)];
        let mut momentum = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];
        for start in [Point::new([1e30, 1.0, 1.0]), Point::new([1.0, -1e30, 1.0])] {
            let end = Point::new([1.0, 1.0, 1.0]);
            let summary = splat_impulse(&mut momentum, &gradient, &start, &end).unwrap();
            assert_eq!(summary, SplatSummary::default());
        }
        assert_eq!(momentum[0].max().unwrap(), 0.0);
    }

    #[test]
    fn test_start_outside_grid_does_nothing() {
        let shape = [3, 3, 3];
        let gradient = [constant(shape, 1.0), constant(shape, 1.0), constant(shape, 1.0)];
        let mut momentum = [constant(shape, 0.0), constant(shape, 0.0), constant(shape, 0.0)];
        let summary = splat_impulse(
            &mut momentum,
            &gradient,
            &Point::new([10.0, 1.0, 1.0]),
            &Point::new([9.0, 1.0, 1.0]),
        )
        .unwrap();
        assert_eq!(summary, SplatSummary::default());
    }
}
