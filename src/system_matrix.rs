//! System-matrix rows: the weights with which each voxel contributes to the
//! value of one bin.
//!
//! A row is assembled from the engine's answers to the bin's sample points:
//!
//! 1. Results rejected by the `ResultFilter` are discarded.
//!
//! 2. Within one ray, every sample in a voxel reports the ray's full chord in
//!    that voxel, so only the first result per voxel is kept.
//!
//! 3. Across the rays of the tube, weights of the same voxel are summed.
//!
//! Rows are kept sorted by voxel index.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::sample::RayIntegral;
use crate::symmetry::SymmetryOperation;
use crate::types::{Index3_i, Weightf32};


// ---------------------- Implementation -----------------------------------------
pub type SystemMatrixElement = (Index3_i, Weightf32);

/// What to do with engine results whose weight is zero, subnormal, infinite or
/// NaN
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFilter {
    /// Keep only weights for which `f32::is_normal` holds
    #[default]
    DropNonNormal,
    AcceptAll,
}

impl ResultFilter {
    #[inline]
    pub fn accepts(self, weight: Weightf32) -> bool {
        match self {
            Self::DropNonNormal => weight.is_normal(),
            Self::AcceptAll     => true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemMatrixRow(Vec<SystemMatrixElement>);

impl SystemMatrixRow {

    /// Build a row from the results of a bin's sample points, grouped into
    /// consecutive rays of `ray_lengths` results each.
    pub fn from_ray_integrals(results: &[RayIntegral], ray_lengths: &[usize], filter: ResultFilter) -> Self {
        debug_assert_eq!(results.len(), ray_lengths.iter().sum::<usize>());
        let mut weights = BTreeMap::<Index3_i, Weightf32>::new();
        let mut remaining = results;
        for &n in ray_lengths {
            let (ray, rest) = remaining.split_at(n.min(remaining.len()));
            remaining = rest;
            let mut previous = None;
            for RayIntegral { voxel, weight } in ray.iter().filter(|r| filter.accepts(r.weight)) {
                if previous == Some(*voxel) { continue }
                previous = Some(*voxel);
                *weights.entry(*voxel).or_insert(0.0) += weight;
            }
        }
        Self(weights.into_iter().collect())
    }

    pub fn from_elements(elements: impl IntoIterator<Item = SystemMatrixElement>) -> Self {
        let mut elements: Vec<_> = elements.into_iter().collect();
        elements.sort_by_key(|&(voxel, _)| voxel);
        Self(elements)
    }

    /// The row of the bin related to this row's bin by `op`
    pub fn transformed(&self, op: &SymmetryOperation) -> Self {
        if op.is_identity() { return self.clone() }
        Self::from_elements(self.iter().map(|&(voxel, weight)| (op.transform_voxel(voxel), weight)))
    }

    pub fn elements(&self) -> &[SystemMatrixElement] { &self.0 }
    pub fn iter(&self) -> std::slice::Iter<SystemMatrixElement> { self.0.iter() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl IntoIterator for SystemMatrixRow {
    type Item = SystemMatrixElement;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SystemMatrixRow {
    type Item = &'a SystemMatrixElement;
    type IntoIter = std::slice::Iter<'a, SystemMatrixElement>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
