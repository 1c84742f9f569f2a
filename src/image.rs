use crate::fov::FOV;
use crate::sinogram::Bin;
use crate::system_matrix::SystemMatrixRow;
use crate::types::{Intensityf32, Index1_u, Index3_u, Point};
use crate::index::index3_to_1;

pub type ImageData = Vec<Intensityf32>;

/// Anything through which a system-matrix row can be forward projected.
pub trait Density: Sync {
    /// The value of `bin`, given its system-matrix `row`
    fn forward_project(&self, row: &SystemMatrixRow, bin: &Bin) -> Intensityf32;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub fov: FOV,
    pub data: ImageData,
}

impl Image {

    pub fn new(fov: FOV, data: ImageData) -> Self {
        assert_eq!(data.len(), fov.n_voxels(), "Image data does not match FOV");
        Self { fov, data }
    }

    pub fn zeros(fov: FOV) -> Self { Self::new(fov, vec![0.0; fov.n_voxels()]) }
    pub fn ones (fov: FOV) -> Self { Self::new(fov, vec![1.0; fov.n_voxels()]) }

    /// Sample `f` at the centre of every voxel
    pub fn from_fn(fov: FOV, f: impl Fn(Point) -> Intensityf32) -> Self {
        let data = (0..fov.n_voxels()).map(|i| f(fov.voxel_centre1(i))).collect();
        Self::new(fov, data)
    }

    pub fn sum(&self) -> Intensityf32 { self.data.iter().sum() }
}

impl Density for Image {
    /// Voxels outside the image contribute nothing.
    fn forward_project(&self, row: &SystemMatrixRow, _bin: &Bin) -> Intensityf32 {
        row.iter()
            .filter_map(|&(voxel, weight)| self.fov.index1(voxel).map(|i| self.data[i] * weight))
            .sum()
    }
}

impl core::ops::IndexMut<Index1_u> for Image {
    #[inline]
    fn index_mut(&mut self, i: Index1_u) -> &mut Self::Output { &mut self.data[i] }
}

impl core::ops::Index<Index1_u> for Image {
    type Output = Intensityf32;
    #[inline]
    fn index(&self, i: Index1_u) -> &Self::Output { &self.data[i] }
}

impl core::ops::IndexMut<Index3_u> for Image {
    fn index_mut(&mut self, i3: Index3_u) -> &mut Self::Output {
        let i1 = index3_to_1(i3, self.fov.n);
        &mut self.data[i1]
    }
}

impl core::ops::Index<Index3_u> for Image {
    type Output = Intensityf32;
    fn index(&self, i3: Index3_u) -> &Self::Output {
        let i1 = index3_to_1(i3, self.fov.n);
        &self.data[i1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    fn fov() -> FOV { FOV::new((3.0, 3.0, 3.0), (3, 3, 3)) }

    #[test]
    fn forward_projection_weights_voxel_values() {
        let mut image = Image::zeros(fov());
        image[[1, 1, 1]] = 2.0;
        image[[0, 1, 2]] = 3.0;
        let row = SystemMatrixRow::from_elements([([1,1,1], 0.5), ([0,1,2], 2.0), ([2,2,2], 7.0)]);
        assert_float_eq!(image.forward_project(&row, &Bin::new(0,0,0,0)), 7.0, ulps <= 1);
    }

    #[test]
    fn voxels_outside_the_image_are_ignored() {
        let image = Image::ones(fov());
        let row = SystemMatrixRow::from_elements([([-1,0,0], 1.0), ([0,3,0], 1.0), ([0,0,-4], 1.0), ([2,2,2], 0.25)]);
        assert_eq!(image.forward_project(&row, &Bin::new(0,0,0,0)), 0.25);
    }

    #[test]
    fn from_fn_samples_voxel_centres() {
        let image = Image::from_fn(fov(), |p| if p.x > 0.0 { 1.0 } else { 0.0 });
        assert_eq!(image.sum(), 9.0);
        assert_eq!(image[[2, 0, 0]], 1.0);
        assert_eq!(image[[1, 0, 0]], 0.0);
    }
}
