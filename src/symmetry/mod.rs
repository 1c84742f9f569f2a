//! Symmetries of the projection geometry: groups of bins whose system-matrix
//! rows are images of each other under a voxel remapping.
//!
//! Every bin has a unique *basic bin* in its orbit. Only the rows of basic bins
//! need to be computed; the row of any other bin is obtained by applying the
//! `SymmetryOperation` which takes the basic bin to it.

pub mod sinogram;
pub use sinogram::{SinogramSymmetries, SymmetryGenerators};

use thiserror::Error;

use crate::sinogram::{AxTangPos, Bin, ViewRanges};
use crate::types::{Index3_i, Vector};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("view {view} outside 0..{num_views}")]
    ViewOutOfRange { view: i32, num_views: i32 },

    #[error("axial position {axial} outside 0..{num_axial}")]
    AxialOutOfRange { axial: i32, num_axial: i32 },

    #[error("quarter-turn symmetry needs an even number of views, got {0}")]
    OddViews(i32),

    #[error("quarter-turn symmetry needs a square transverse grid, got {nx} x {ny} voxels of {dx} x {dy} mm")]
    NonSquare { nx: usize, ny: usize, dx: f32, dy: f32 },
}

/// Maps the voxels of a basic bin's row onto those of a related bin's row.
///
/// Applied in order: axial shift, inversion through the FOV centre, quarter
/// turn about the z-axis. The default is the identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SymmetryOperation {
    /// Voxels added to the z index
    pub z_shift: i32,
    /// Voxel counts along each axis, if inverting through the centre
    pub inversion: Option<[i32; 3]>,
    /// Voxel count along x (= y), if rotating by a quarter turn
    pub quarter_turn: Option<i32>,
}

impl SymmetryOperation {

    pub fn is_identity(&self) -> bool { *self == Self::default() }

    #[inline]
    pub fn transform_voxel(&self, [mut ix, mut iy, mut iz]: Index3_i) -> Index3_i {
        iz += self.z_shift;
        if let Some([nx, ny, nz]) = self.inversion {
            ix = nx - 1 - ix;
            iy = ny - 1 - iy;
            iz = nz - 1 - iz;
        }
        if let Some(n) = self.quarter_turn {
            (ix, iy) = (n - 1 - iy, ix);
        }
        [ix, iy, iz]
    }

    /// The linear part of the operation, acting on physical vectors: the
    /// axial shift leaves them alone.
    #[inline]
    pub fn transform_direction(&self, mut v: Vector) -> Vector {
        if self.inversion.is_some() { v = -v; }
        if self.quarter_turn.is_some() { v = Vector::new(-v.y, v.x, v.z); }
        v
    }
}

/// A symmetry group acting on bins.
pub trait Symmetries: Send + Sync {

    /// The basic bin of `bin`'s orbit, and the operation that takes the basic
    /// bin's row to `bin`'s row.
    fn find_symmetry_operation_from_basic_bin(&self, bin: &Bin) -> Result<(Bin, SymmetryOperation), SymmetryError>;

    /// Reduce `bin` to its basic bin. Every member of an orbit reduces to the
    /// same basic bin.
    fn find_basic_bin(&self, bin: &Bin) -> Result<Bin, SymmetryError> {
        Ok(self.find_symmetry_operation_from_basic_bin(bin)?.0)
    }

    /// Positions, within `ranges`, of the bins whose basic bin is `basic`, in
    /// every view returned by `related_views`.
    fn related_bins(&self, basic: &Bin, ranges: &ViewRanges) -> Vec<AxTangPos>;

    /// The (segment, view) pairs whose bins are related to those of the given
    /// (segment, view). The basic pair comes first.
    fn related_views(&self, segment: i32, view: i32) -> Result<Vec<(i32, i32)>, SymmetryError>;
}

/// The trivial group: every bin is its own basic bin.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSymmetries;

impl Symmetries for NoSymmetries {
    fn find_symmetry_operation_from_basic_bin(&self, bin: &Bin) -> Result<(Bin, SymmetryOperation), SymmetryError> {
        Ok((*bin, SymmetryOperation::default()))
    }

    fn related_bins(&self, basic: &Bin, ranges: &ViewRanges) -> Vec<AxTangPos> {
        let pos = basic.ax_tang();
        if ranges.contains(pos) { vec![pos] } else { vec![] }
    }

    fn related_views(&self, segment: i32, view: i32) -> Result<Vec<(i32, i32)>, SymmetryError> {
        Ok(vec![(segment, view)])
    }
}
