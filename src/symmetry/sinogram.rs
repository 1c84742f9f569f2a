//! Symmetries of a parallel-beam sinogram over an image centred on the origin.

use itertools::Itertools;
use serde::Deserialize;

use crate::sinogram::{AxTangPos, Bin, ScannerGeometry, ViewRanges};
use crate::symmetry::{Symmetries, SymmetryError, SymmetryOperation};

/// Which generators of the group are enabled
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SymmetryGenerators {
    /// `a → a + k`: shift the image by `k` axial positions
    pub axial_shift: bool,
    /// `(a, t) → (N_a - 1 - a, -t)`: point reflection through the FOV centre
    pub inversion: bool,
    /// `v → v + V/2`: rotate the image by 90° about the z-axis
    pub quarter_turn: bool,
}

impl SymmetryGenerators {
    pub fn all() -> Self { Self { axial_shift: true, inversion: true, quarter_turn: true } }
}

/// Basic bins have axial position 0 (with axial shifts), non-negative
/// tangential position (with inversion) and a view in the first half of the
/// views (with quarter turns).
#[derive(Clone, Debug, PartialEq)]
pub struct SinogramSymmetries {
    generators: SymmetryGenerators,
    num_views: i32,
    num_axial: i32,
    voxels_per_axial_position: i32,
    n: [i32; 3],
}

impl SinogramSymmetries {

    pub fn new(geometry: &ScannerGeometry, generators: SymmetryGenerators) -> Result<Self, SymmetryError> {
        let fov = &geometry.fov;
        let [nx, ny, nz] = fov.n;
        if generators.quarter_turn {
            if geometry.num_views % 2 != 0 {
                return Err(SymmetryError::OddViews(geometry.num_views))
            }
            let (dx, dy) = (fov.voxel_size.x, fov.voxel_size.y);
            if nx != ny || (dx - dy).abs() > 1e-6 * dx.abs().max(dy.abs()) {
                return Err(SymmetryError::NonSquare { nx, ny, dx, dy })
            }
        }
        Ok(Self {
            generators,
            num_views: geometry.num_views,
            num_axial: geometry.num_axial_positions(),
            voxels_per_axial_position: geometry.voxels_per_axial_position,
            n: [nx as i32, ny as i32, nz as i32],
        })
    }

    pub fn generators(&self) -> SymmetryGenerators { self.generators }

    fn check(&self, bin: &Bin) -> Result<(), SymmetryError> {
        if !(0..self.num_views).contains(&bin.view) {
            return Err(SymmetryError::ViewOutOfRange { view: bin.view, num_views: self.num_views })
        }
        let g = self.generators;
        if (g.axial_shift || g.inversion) && !(0..self.num_axial).contains(&bin.axial) {
            return Err(SymmetryError::AxialOutOfRange { axial: bin.axial, num_axial: self.num_axial })
        }
        Ok(())
    }
}

impl Symmetries for SinogramSymmetries {

    fn find_symmetry_operation_from_basic_bin(&self, bin: &Bin) -> Result<(Bin, SymmetryOperation), SymmetryError> {
        self.check(bin)?;
        let g = self.generators;
        let mut basic = *bin;
        let mut op = SymmetryOperation::default();

        // Undo the generators in the reverse of the order in which they apply
        let half = self.num_views / 2;
        if g.quarter_turn && basic.view >= half {
            basic.view -= half;
            op.quarter_turn = Some(self.n[0]);
        }
        if g.inversion && basic.tangential < 0 {
            basic.tangential = -basic.tangential;
            basic.axial = self.num_axial - 1 - basic.axial;
            op.inversion = Some(self.n);
        }
        if g.axial_shift {
            op.z_shift = basic.axial * self.voxels_per_axial_position;
            basic.axial = 0;
        }
        Ok((basic, op))
    }

    fn related_bins(&self, basic: &Bin, ranges: &ViewRanges) -> Vec<AxTangPos> {
        let g = self.generators;
        let axials: Vec<i32> = if g.axial_shift {
            ranges.axial.iter().collect()
        } else if g.inversion {
            vec![basic.axial, self.num_axial - 1 - basic.axial]
        } else {
            vec![basic.axial]
        };
        let tangentials = if g.inversion { vec![basic.tangential, -basic.tangential] }
                          else           { vec![basic.tangential] };
        itertools::iproduct!(tangentials, axials)
            .map(|(t, a)| AxTangPos::new(a, t))
            .filter(|&pos| ranges.contains(pos))
            .unique()
            .filter(|&pos| self.find_basic_bin(&basic.with_ax_tang(pos)).ok().as_ref() == Some(basic))
            .collect()
    }

    fn related_views(&self, segment: i32, view: i32) -> Result<Vec<(i32, i32)>, SymmetryError> {
        if !(0..self.num_views).contains(&view) {
            return Err(SymmetryError::ViewOutOfRange { view, num_views: self.num_views })
        }
        Ok(if self.generators.quarter_turn {
            let half = self.num_views / 2;
            let basic = view % half;
            vec![(segment, basic), (segment, basic + half)]
        } else {
            vec![(segment, view)]
        })
    }
}
