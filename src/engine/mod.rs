//! The ray-integral engine: an opaque batch-in/batch-out numeric capability.
//!
//! The engine receives a batch with a fixed number of slots (some of which may
//! be zero padding) and must answer every slot with one output row
//! `(weight, voxel_x, voxel_y, voxel_z)`, in the same order. It is not told
//! which slots are padding. The voxel coordinates are floats, to be rounded to
//! integers by the caller; in the rows answering real requests they must be
//! finite.

pub mod chord;
pub use chord::ChordEngine;

use ndarray::{Array2, ArrayView1, ArrayView2};
use thiserror::Error;

/// Number of columns in the engine's output: weight and three voxel coordinates
pub const OUTPUT_COLUMNS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine returned output of shape {got:?}, expected {expected:?}")]
    MalformedOutput { expected: (usize, usize), got: (usize, usize) },

    #[error("engine returned unusable voxel coordinates in slot {slot}: {row:?}")]
    BadVoxel { slot: usize, row: [f32; OUTPUT_COLUMNS] },

    #[error("engine fault: {0}")]
    Fault(String),
}

/// One batch, as seen by the engine.
#[derive(Clone, Copy, Debug)]
pub struct EngineInput<'a> {
    /// `capacity × 3`, in grid coordinates
    pub positions: ArrayView2<'a, f32>,
    /// `capacity × 3`, unit vectors (zero in padding slots)
    pub directions: ArrayView2<'a, f32>,
    /// `capacity`
    pub norm_consts: ArrayView1<'a, f32>,
    /// Shared by all slots
    pub voxel_size: [f32; 3],
}

impl EngineInput<'_> {
    pub fn capacity(&self) -> usize { self.norm_consts.len() }
}

pub trait RayIntegralEngine {
    /// Integrate every slot of `input`. The result must have shape
    /// `(input.capacity(), OUTPUT_COLUMNS)`.
    fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError>;
}

impl<E: RayIntegralEngine + ?Sized> RayIntegralEngine for Box<E> {
    fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
        (**self).integrate(input)
    }
}
