//! Fixed-capacity storage for sample points awaiting the engine.

use ndarray::{s, Array1, Array2};

use crate::engine::EngineInput;
use super::DispatchError;
use crate::sample::SamplePoint;

/// Pending sample points, stored in the column layout that the engine
/// consumes. Only the first `len()` slots are valid; the rest are zeros.
#[derive(Clone, Debug)]
pub struct SampleBatch {
    positions: Array2<f32>,
    directions: Array2<f32>,
    norm_consts: Array1<f32>,
    voxel_size: [f32; 3],
    cursor: usize,
}

impl SampleBatch {

    pub fn new(capacity: usize, voxel_size: [f32; 3]) -> Result<Self, DispatchError> {
        if capacity == 0 { return Err(DispatchError::ZeroCapacity) }
        Ok(Self {
            positions:   Array2::zeros((capacity, 3)),
            directions:  Array2::zeros((capacity, 3)),
            norm_consts: Array1::zeros(capacity),
            voxel_size,
            cursor: 0,
        })
    }

    pub fn capacity(&self) -> usize { self.norm_consts.len() }
    pub fn len     (&self) -> usize { self.cursor }
    pub fn is_empty(&self) -> bool  { self.cursor == 0 }
    pub fn is_full (&self) -> bool  { self.cursor == self.capacity() }

    /// Store `point` in the next free slot, or hand it back if there is none.
    pub fn push(&mut self, point: SamplePoint) -> Result<(), SamplePoint> {
        if self.is_full() { return Err(point) }
        let i = self.cursor;
        let SamplePoint { position: p, direction: d, norm_const } = point;
        for dim in 0..3 {
            self.positions [(i, dim)] = p[dim];
            self.directions[(i, dim)] = d[dim];
        }
        self.norm_consts[i] = norm_const;
        self.cursor += 1;
        Ok(())
    }

    /// The whole batch, padding included, as the engine sees it
    pub fn engine_input(&self) -> EngineInput<'_> {
        EngineInput {
            positions: self.positions.view(),
            directions: self.directions.view(),
            norm_consts: self.norm_consts.view(),
            voxel_size: self.voxel_size,
        }
    }

    /// Return the used slots to zero padding and rewind the cursor
    pub fn reset(&mut self) {
        let n = self.cursor;
        self.positions  .slice_mut(s![..n, ..]).fill(0.0);
        self.directions .slice_mut(s![..n, ..]).fill(0.0);
        self.norm_consts.slice_mut(s![..n    ]).fill(0.0);
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, Vector};

    fn point(x: f32) -> SamplePoint {
        SamplePoint::new(Point::new(x, 2.0, 3.0), Vector::new(0.0, 0.0, 1.0), 0.5)
    }

    #[test]
    fn cursor_never_exceeds_capacity() {
        let mut batch = SampleBatch::new(2, [1.0; 3]).unwrap();
        assert_eq!(batch.push(point(1.0)), Ok(()));
        assert_eq!(batch.push(point(2.0)), Ok(()));
        assert!(batch.is_full());
        assert_eq!(batch.push(point(3.0)), Err(point(3.0)));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn slots_beyond_cursor_are_zero_padding() {
        let mut batch = SampleBatch::new(3, [1.0; 3]).unwrap();
        batch.push(point(7.0)).unwrap();
        batch.push(point(8.0)).unwrap();
        batch.reset();
        batch.push(point(9.0)).unwrap();
        let input = batch.engine_input();
        assert_eq!(input.capacity(), 3);
        assert_eq!(input.positions.row(0).to_vec(), vec![9.0, 2.0, 3.0]);
        assert_eq!(input.positions.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(input.directions.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(input.norm_consts.to_vec(), vec![0.5, 0.0, 0.0]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(SampleBatch::new(0, [1.0; 3]), Err(DispatchError::ZeroCapacity)));
    }
}
