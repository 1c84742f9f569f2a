/// The size and granularity of the Field of View (FOV) in which images are
/// defined. The FOV is an axis-aligned box centred on the origin.

use crate::types::{Lengthf32, Point, Vector};
use crate::index::{BoxDim_u, Index1_u, Index3_i, checked_index3_to_1, index1_to_3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FOV {
    pub half_width: Vector,
    pub n: BoxDim_u,
    pub voxel_size: Vector,
}

impl FOV {

    pub fn new(
        full_size: (Lengthf32, Lengthf32, Lengthf32),
        (nx, ny, nz): (usize, usize, usize)
    ) -> Self {
        let (dx, dy, dz) = full_size;
        let half_width = Vector::new(dx/2.0, dy/2.0, dz/2.0);
        let n = [nx, ny, nz];
        let voxel_size = Self::voxel_size(n, half_width);
        Self { half_width, n, voxel_size }
    }

    fn voxel_size(n: BoxDim_u, half_width: Vector) -> Vector {
        let full_width = half_width * 2.0;
        Vector::new(full_width[0] / n[0] as f32,
                    full_width[1] / n[1] as f32,
                    full_width[2] / n[2] as f32,
        )
    }

    pub fn n_voxels(&self) -> usize { self.n.iter().product() }

    /// Find centre of voxel with given 3D index
    pub fn voxel_centre(&self, i: [usize; 3]) -> Point {
        let s = self.voxel_size;
        Point::new((i[0] as Lengthf32 + 0.5) * s.x - self.half_width[0],
                   (i[1] as Lengthf32 + 0.5) * s.y - self.half_width[1],
                   (i[2] as Lengthf32 + 0.5) * s.z - self.half_width[2],)
    }

    /// Find centre of voxel with given 1D index
    pub fn voxel_centre1(&self, i: Index1_u) -> Point {
        self.voxel_centre(index1_to_3(i, self.n))
    }

    /// Position of `p` in grid coordinates: the lower corner of the FOV at the
    /// origin, so that `floor(position / voxel_size)` is the voxel index.
    #[inline]
    pub fn to_grid(&self, p: Point) -> Point { p + self.half_width }

    /// 1D index of the voxel, if it lies inside the FOV
    #[inline]
    pub fn index1(&self, i: Index3_i) -> Option<Index1_u> { checked_index3_to_1(i, self.n) }

    /// Is `p` within the FOV's extent in the transverse (xy) plane?
    pub fn contains_xy(&self, p: Point) -> bool {
        p.x.abs() <= self.half_width.x && p.y.abs() <= self.half_width.y
    }

    /// Distance from the centre to any corner: no line segment of this
    /// half-length, centred inside the FOV, can miss any part of the FOV.
    pub fn half_diagonal(&self) -> Lengthf32 { self.half_width.norm() }

}

#[cfg(test)]
mod test_voxel_box {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    #[rstest(/**/ index,   expected_position,
             case([0,0,0], [-1.0, -1.0, -1.0]),
             case([0,0,1], [-1.0, -1.0,  1.0]),
             case([0,1,0], [-1.0,  1.0, -1.0]),
             case([1,0,0], [ 1.0, -1.0, -1.0]),
             case([1,1,1], [ 1.0,  1.0,  1.0]),
    )]
    fn test_voxel_centre(index: [usize; 3], expected_position: [Lengthf32; 3]) {
        let fov = FOV::new((4.0, 4.0, 4.0), (2,2,2));
        let c = fov.voxel_centre(index).to_array();
        assert_float_eq!(c, expected_position, ulps <= [1, 1, 1]);
    }

    #[test]
    fn voxel_centres_map_to_their_own_grid_index() {
        let fov = FOV::new((10.0, 6.0, 9.0), (5, 3, 3));
        for i in 0..fov.n_voxels() {
            let g = fov.to_grid(fov.voxel_centre1(i));
            let i3 = [0, 1, 2].map(|d| (g[d] / fov.voxel_size[d]).floor() as i32);
            assert_eq!(fov.index1(i3), Some(i));
        }
    }

    #[test]
    fn contains_xy_ignores_z() {
        let fov = FOV::new((10.0, 10.0, 2.0), (5, 5, 1));
        assert!( fov.contains_xy(Point::new( 4.9, -4.9, 100.0)));
        assert!(!fov.contains_xy(Point::new( 5.1,  0.0,   0.0)));
        assert!(!fov.contains_xy(Point::new( 0.0, -5.1,   0.0)));
    }
}
