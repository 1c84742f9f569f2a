//! Voxel indices. Matrix rows carry signed 3D indices, because symmetry
//! operations can move a voxel outside the image (and back again); only the
//! image itself decides which of them are real.

use std::ops::{Add, Div, Mul, Rem};

#[allow(non_camel_case_types)] pub type Index1_u = usize;
#[allow(non_camel_case_types)] pub type Index3_u = [usize; 3];
#[allow(non_camel_case_types)] pub type Index3_i = [i32; 3];
#[allow(non_camel_case_types)] pub type BoxDim_u = [usize; 3];

pub fn index3_to_1<T>([ix, iy, iz]: [T; 3], [nx, ny, _nz]: [T; 3]) -> T
where
    T: Mul<Output = T> + Add<Output = T>
{
    ix + (iy + iz * ny) * nx
}

#[allow(clippy::many_single_char_names)]
pub fn index1_to_3<T>(i: T, [nx, ny, _nz]: [T; 3]) -> [T; 3]
where
    T: Mul<Output = T> +
    Div<Output = T> +
    Rem<Output = T> +
    Copy
{
    let z = i / (nx * ny);
    let r = i % (nx * ny);
    let y = r / nx;
    let x = r % nx;
    [x,y,z]
}

/// 1D index of a signed 3D index, or `None` if it lies outside a box of size `n`
#[inline]
pub fn checked_index3_to_1(i: Index3_i, n: BoxDim_u) -> Option<Index1_u> {
    let mut u = [0_usize; 3];
    for d in 0..3 {
        let id = usize::try_from(i[d]).ok()?;
        if id >= n[d] { return None }
        u[d] = id;
    }
    Some(index3_to_1(u, n))
}
