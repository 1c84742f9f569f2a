//! Identification of measurement bins, and the containers which hold their
//! values.

pub mod geometry;
pub mod viewgram;

pub use geometry::ScannerGeometry;
pub use viewgram::{Viewgram, RelatedViewgrams};

use thiserror::Error;

/// An identified measurement cell in projection space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bin {
    pub segment: i32,
    pub view: i32,
    pub axial: i32,
    pub tangential: i32,
}

impl Bin {
    pub fn new(segment: i32, view: i32, axial: i32, tangential: i32) -> Self {
        Self { segment, view, axial, tangential }
    }

    pub fn ax_tang(&self) -> AxTangPos { AxTangPos { axial: self.axial, tangential: self.tangential } }

    /// The bin at position `pos` in the same segment and view
    pub fn with_ax_tang(self, AxTangPos { axial, tangential }: AxTangPos) -> Self {
        Self { axial, tangential, ..self }
    }
}

use std::fmt;
impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Bin seg {:3} view {:3} ax {:4} tang {:4}>",
               self.segment, self.view, self.axial, self.tangential)
    }
}

/// Position of a bin within a viewgram
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AxTangPos {
    pub axial: i32,
    pub tangential: i32,
}

impl AxTangPos {
    pub fn new(axial: i32, tangential: i32) -> Self { Self { axial, tangential } }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("empty position range {min}..={max}")]
pub struct EmptyRange { pub min: i32, pub max: i32 }

/// Inclusive range of integer positions `min ..= max`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PosRange {
    pub min: i32,
    pub max: i32,
}

impl PosRange {
    /// Empty ranges (`max < min`) are never meaningful here.
    pub fn new(min: i32, max: i32) -> Result<Self, EmptyRange> {
        if max < min { return Err(EmptyRange { min, max }) }
        Ok(Self { min, max })
    }

    pub fn len(&self) -> usize { (self.max - self.min + 1) as usize }

    // Never empty, but clippy wants this next to `len`
    pub fn is_empty(&self) -> bool { false }

    pub fn contains(&self, i: i32) -> bool { self.min <= i && i <= self.max }

    pub fn iter(&self) -> std::ops::RangeInclusive<i32> { self.min..=self.max }

    /// Offset of `i` from the start of the range
    pub fn offset(&self, i: i32) -> Option<usize> {
        self.contains(i).then(|| (i - self.min) as usize)
    }
}

/// The axial and tangential extent of a viewgram
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewRanges {
    pub axial: PosRange,
    pub tangential: PosRange,
}

impl ViewRanges {
    pub fn new(axial: PosRange, tangential: PosRange) -> Self { Self { axial, tangential } }

    pub fn contains(&self, AxTangPos { axial, tangential }: AxTangPos) -> bool {
        self.axial.contains(axial) && self.tangential.contains(tangential)
    }

    pub fn n_bins(&self) -> usize { self.axial.len() * self.tangential.len() }

    /// All positions, tangential-major, axial varying fastest
    pub fn positions(&self) -> impl Iterator<Item = AxTangPos> {
        itertools::iproduct!(self.tangential.iter(), self.axial.iter())
            .map(|(t, a)| AxTangPos::new(a, t))
    }
}
