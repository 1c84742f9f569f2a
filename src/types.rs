pub use units::todo::{Lengthf32, Weightf32, Intensityf32};
pub use geometry::{Point, Vector};

pub use crate::index::{BoxDim_u, Index1_u, Index3_i, Index3_u};
