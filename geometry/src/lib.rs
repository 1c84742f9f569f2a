//! Points and vectors in 3D space. Components are `f32` lengths in mm.

mod point;
mod vector;

pub use point::Point;
pub use vector::Vector;
