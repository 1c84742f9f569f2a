//! Forward projection of density images into parallel-beam sinograms, with
//! system-matrix rows computed on demand by a batched ray-integral engine and
//! shared between bins related by the symmetries of the geometry.

pub mod types;
pub use types::*;

pub mod index;
pub mod fov;
pub mod sinogram;
pub mod lor;
pub mod sample;
pub mod engine;
pub mod batch;
pub mod system_matrix;
pub mod symmetry;
pub mod image;
pub mod processed;
pub mod projector;
pub mod config;
pub mod utils;
