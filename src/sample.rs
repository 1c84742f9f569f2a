//! The units of work exchanged with the ray-integral engine.

use crate::types::{Index3_i, Point, Vector, Weightf32};

/// A request to integrate along a ray through `position`: the engine reports
/// the voxel containing `position` and the ray's weight in that voxel, scaled
/// by `norm_const`.
///
/// `position` is in grid coordinates (see `FOV::to_grid`); `direction` should
/// be a unit vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub position: Point,
    pub direction: Vector,
    pub norm_const: f32,
}

impl SamplePoint {
    pub fn new(position: Point, direction: Vector, norm_const: f32) -> Self {
        Self { position, direction, norm_const }
    }
}

/// The engine's answer to one `SamplePoint`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayIntegral {
    pub voxel: Index3_i,
    pub weight: Weightf32,
}

impl RayIntegral {
    /// Interpret one engine output row: `(weight, x, y, z)` with voxel
    /// coordinates as floats. `None` if any coordinate is not finite or does
    /// not round to an `i32`.
    pub fn from_engine_row([weight, x, y, z]: [f32; 4]) -> Option<Self> {
        let usable = |c: f32| c.is_finite() && c.round().abs() < i32::MAX as f32;
        if ![x, y, z].into_iter().all(usable) { return None }
        let voxel = [x, y, z].map(|c| c.round() as i32);
        Some(Self { voxel, weight })
    }
}
