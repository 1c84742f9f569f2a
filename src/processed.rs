//! Bookkeeping of which bins of a viewgram have already been given a value.

use ndarray::Array2;

use crate::sinogram::{AxTangPos, ViewRanges};

/// One flag per (axial, tangential) position of a viewgram
#[derive(Clone, Debug, PartialEq)]
pub struct AlreadyProcessed {
    ranges: ViewRanges,
    marked: Array2<bool>,
}

impl AlreadyProcessed {

    pub fn new(ranges: ViewRanges) -> Self {
        Self { ranges, marked: Array2::from_elem((ranges.axial.len(), ranges.tangential.len()), false) }
    }

    fn offsets(&self, AxTangPos { axial, tangential }: AxTangPos) -> Option<(usize, usize)> {
        Some((self.ranges.axial.offset(axial)?, self.ranges.tangential.offset(tangential)?))
    }

    /// Positions outside the ranges are never marked.
    pub fn is_marked(&self, pos: AxTangPos) -> bool {
        self.offsets(pos).map_or(false, |i| self.marked[i])
    }

    /// Mark `pos`, returning `false` if it was already marked or lies outside
    /// the ranges.
    pub fn mark(&mut self, pos: AxTangPos) -> bool {
        match self.offsets(pos) {
            Some(i) if !self.marked[i] => { self.marked[i] = true; true }
            _ => false,
        }
    }

    pub fn count(&self) -> usize { self.marked.iter().filter(|&&m| m).count() }

    pub fn is_complete(&self) -> bool { self.count() == self.ranges.n_bins() }

    /// `Err((marked, expected))` unless every position has been marked
    pub fn check_complete(&self) -> Result<(), (usize, usize)> {
        if self.is_complete() { Ok(()) } else { Err((self.count(), self.ranges.n_bins())) }
    }
}
