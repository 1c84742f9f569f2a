//! Parallel-beam sinogram geometry: the line of response of every bin.

use std::f32::consts::PI;

use thiserror::Error;

use crate::fov::FOV;
use crate::lor::Lor;
use crate::sinogram::{Bin, PosRange, ViewRanges};
use crate::types::{Lengthf32, Point, Vector};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("need at least one view, got {0}")]
    NoViews(i32),

    #[error("axial spacing {spacing} mm is not a whole multiple of the axial voxel size {voxel} mm")]
    AxialSpacing { spacing: Lengthf32, voxel: Lengthf32 },

    #[error("{n_voxels} axial voxels cannot be split into axial positions of {per_position} voxels")]
    AxialPositions { n_voxels: usize, per_position: i32 },

    #[error("spacing must be strictly positive, got {0} mm")]
    Spacing(Lengthf32),
}

/// Bins and their LORs
///
/// + view `v` has azimuthal angle `φ = vπ/V`
/// + tangential position `t` lies at signed distance `t·Δs` from the z-axis,
///   along `(-sin φ, cos φ, 0)`
/// + axial position `a` has its midpoint at height `(a + ½)Δz - h_z`, where
///   `h_z` is the half-height of the FOV
/// + segment `g` tilts the LOR out of the transverse plane: its direction is
///   parallel to `(cos φ, sin φ, g·slope)`
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerGeometry {
    pub fov: FOV,
    pub num_views: i32,
    pub tangential: PosRange,
    pub tangential_spacing: Lengthf32,
    /// How many voxels (in z) one axial step spans
    pub voxels_per_axial_position: i32,
    pub segments: Vec<i32>,
    pub segment_slope: f32,
}

impl ScannerGeometry {

    pub fn new(
        fov               : FOV,
        num_views         : i32,
        tangential        : PosRange,
        tangential_spacing: Lengthf32,
        axial_spacing     : Lengthf32,
        segments          : Vec<i32>,
        segment_slope     : f32,
    ) -> Result<Self, GeometryError> {
        if num_views < 1 { return Err(GeometryError::NoViews(num_views)) }
        for spacing in [tangential_spacing, axial_spacing] {
            if spacing <= 0.0 { return Err(GeometryError::Spacing(spacing)) }
        }
        let voxel = fov.voxel_size.z;
        let ratio = axial_spacing / voxel;
        let voxels_per_axial_position = ratio.round() as i32;
        if voxels_per_axial_position < 1 || (ratio - voxels_per_axial_position as f32).abs() > 1e-3 {
            return Err(GeometryError::AxialSpacing { spacing: axial_spacing, voxel })
        }
        if fov.n[2] == 0 || fov.n[2] % voxels_per_axial_position as usize != 0 {
            return Err(GeometryError::AxialPositions { n_voxels: fov.n[2], per_position: voxels_per_axial_position })
        }
        Ok(Self { fov, num_views, tangential, tangential_spacing, voxels_per_axial_position, segments, segment_slope })
    }

    /// Distance between the midpoints of neighbouring axial positions. Always
    /// an exact multiple of the axial voxel size.
    pub fn axial_spacing(&self) -> Lengthf32 {
        self.voxels_per_axial_position as f32 * self.fov.voxel_size.z
    }

    pub fn num_axial_positions(&self) -> i32 {
        self.fov.n[2] as i32 / self.voxels_per_axial_position
    }

    /// Every axial and tangential position in the sinogram
    pub fn view_ranges(&self) -> ViewRanges {
        // `new` guarantees at least one axial position
        ViewRanges::new(PosRange { min: 0, max: self.num_axial_positions() - 1 }, self.tangential)
    }

    pub fn view_angle(&self, view: i32) -> f32 { view as f32 * PI / self.num_views as f32 }

    pub fn lor(&self, bin: &Bin) -> Lor {
        let phi = self.view_angle(bin.view);
        let (sin, cos) = phi.sin_cos();
        let s = bin.tangential as f32 * self.tangential_spacing;
        let z = (bin.axial as f32 + 0.5) * self.axial_spacing() - self.fov.half_width.z;
        let midpoint = Point::new(-s * sin, s * cos, z);
        let direction = Vector::new(cos, sin, bin.segment as f32 * self.segment_slope).normalize();
        Lor { midpoint, direction }
    }
}
