//! Native engine: the length of the chord which the ray cuts through the voxel
//! containing the sample point.
//!
//! The distance to the nearest voxel boundary is found independently in each
//! dimension, by expressing the remaining distances in units of the ray
//! direction: forwards this gives the exit point, backwards the entry point.
//! The chord is the sum of the two. Axes parallel to the ray never limit it.

use ndarray::{Array2, ArrayView1, Zip};

use super::{EngineError, EngineInput, RayIntegralEngine, OUTPUT_COLUMNS};

#[derive(Clone, Copy, Debug, Default)]
pub struct ChordEngine;

impl ChordEngine {
    pub fn new() -> Self { Self }
}

impl RayIntegralEngine for ChordEngine {
    fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
        let size = input.voxel_size;
        if size.iter().any(|s| !(*s > 0.0)) {
            return Err(EngineError::Fault(format!("invalid voxel size {size:?}")))
        }
        let mut out = Array2::zeros((input.capacity(), OUTPUT_COLUMNS));
        Zip::from(out.rows_mut())
            .and(input.positions.rows())
            .and(input.directions.rows())
            .and(&input.norm_consts)
            .for_each(|mut row, p, d, &norm_const| {
                let (voxel, chord) = chord_in_voxel(p, d, size);
                row[0] = norm_const * chord;
                row[1] = voxel[0];
                row[2] = voxel[1];
                row[3] = voxel[2];
            });
        Ok(out)
    }
}

/// Index (as floats) of the voxel containing `p`, and the length of the line
/// through `p` along `d` inside that voxel.
#[inline]
fn chord_in_voxel(p: ArrayView1<f32>, d: ArrayView1<f32>, size: [f32; 3]) -> ([f32; 3], f32) {
    let mut voxel = [0.0; 3];
    let mut forward  = f32::INFINITY;
    let mut backward = f32::INFINITY;
    for dim in 0..3 {
        voxel[dim] = (p[dim] / size[dim]).floor();
        let lower = voxel[dim] * size[dim];
        let upper = lower + size[dim];
        let (to_upper, to_lower) = (upper - p[dim], p[dim] - lower);
        let along = d[dim];
        if along > 0.0 {
            forward  = forward .min(to_upper /  along);
            backward = backward.min(to_lower /  along);
        } else if along < 0.0 {
            forward  = forward .min(to_lower / -along);
            backward = backward.min(to_upper / -along);
        }
    }
    // Zero direction (padding slots): no chord
    let chord = if forward.is_finite() && backward.is_finite() { forward + backward } else { 0.0 };
    (voxel, chord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::{arr1, arr2};
    use rstest::rstest;

    fn integrate_one(p: [f32; 3], d: [f32; 3], norm: f32, size: [f32; 3]) -> [f32; 4] {
        let positions  = arr2(&[p]);
        let directions = arr2(&[d]);
        let norms      = arr1(&[norm]);
        let input = EngineInput {
            positions: positions.view(),
            directions: directions.view(),
            norm_consts: norms.view(),
            voxel_size: size,
        };
        let out = ChordEngine.integrate(&input).unwrap();
        assert_eq!(out.dim(), (1, OUTPUT_COLUMNS));
        [out[(0, 0)], out[(0, 1)], out[(0, 2)], out[(0, 3)]]
    }

    const R2: f32 = std::f32::consts::SQRT_2;

    #[rstest(/**/ position       , direction          , size           , expected,
             // Axis-aligned rays cross the whole voxel, wherever they enter it
             case([0.5, 0.5, 0.5], [1.0, 0.0, 0.0]    , [1.0, 1.0, 1.0], [1.0    , 0.0, 0.0, 0.0]),
             case([2.9, 1.1, 0.2], [0.0,-1.0, 0.0]    , [1.0, 1.0, 1.0], [1.0    , 2.0, 1.0, 0.0]),
             case([3.0, 5.0, 7.0], [0.0, 0.0, 1.0]    , [2.0, 2.0, 2.5], [2.5    , 1.0, 2.0, 2.0]),
             // Diagonal through the centre of a square voxel
             case([0.5, 0.5, 0.5], [0.5*R2, 0.5*R2, 0.0], [1.0, 1.0, 1.0], [R2     , 0.0, 0.0, 0.0]),
             // Diagonal clipping a corner
             case([0.9, 0.3, 0.5], [0.5*R2, 0.5*R2, 0.0], [1.0, 1.0, 1.0], [0.4*R2 , 0.0, 0.0, 0.0]),
             // Negative grid coordinates are legal
             case([-0.5, 0.5, 0.5], [1.0, 0.0, 0.0]   , [1.0, 1.0, 1.0], [1.0    ,-1.0, 0.0, 0.0]),
    )]
    fn hand_picked_chords(position: [f32; 3], direction: [f32; 3], size: [f32; 3], expected: [f32; 4]) {
        let got = integrate_one(position, direction, 1.0, size);
        assert_float_eq!(got, expected, abs <= [1e-5; 4]);
    }

    #[test]
    fn norm_const_scales_the_weight() {
        let got = integrate_one([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], 0.25, [2.0, 2.0, 2.0]);
        assert_float_eq!(got[0], 0.5, ulps <= 1);
    }

    #[test]
    fn padding_slots_have_zero_weight() {
        let got = integrate_one([0.0; 3], [0.0; 3], 0.0, [1.0, 1.0, 1.0]);
        assert_eq!(got, [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn nonsensical_voxel_size_is_a_fault() {
        let positions  = arr2(&[[0.0_f32; 3]]);
        let norms      = arr1(&[1.0_f32]);
        let input = EngineInput {
            positions: positions.view(),
            directions: positions.view(),
            norm_consts: norms.view(),
            voxel_size: [1.0, 0.0, 1.0],
        };
        assert!(matches!(ChordEngine.integrate(&input), Err(EngineError::Fault(_))));
    }

    use proptest::prelude::*;
    proptest! {
        // No chord is negative, or longer than the voxel's diagonal
        #[test]
        fn chord_never_exceeds_voxel_diagonal(
            px in 0.0..(10.0 as f32), py in 0.0..(10.0 as f32), pz in 0.0..(10.0 as f32),
            dx in -1.0..(1.0 as f32), dy in -1.0..(1.0 as f32), dz in -1.0..(1.0 as f32),
        ) {
            let n = (dx*dx + dy*dy + dz*dz).sqrt();
            prop_assume!(n > 1e-3);
            let [w, ..] = integrate_one([px, py, pz], [dx/n, dy/n, dz/n], 1.0, [1.0, 2.0, 3.0]);
            let diagonal = (1.0_f32 + 4.0 + 9.0).sqrt();
            prop_assert!(w >= 0.0);
            prop_assert!(w <= diagonal * (1.0 + 1e-5));
        }
    }
}
