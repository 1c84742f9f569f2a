use ndarray::Array2;

use crate::sinogram::{AxTangPos, Bin, ViewRanges};
use crate::symmetry::{Symmetries, SymmetryError};
use crate::types::Weightf32;

/// Bin values of one (segment, view) pair, over a rectangle of axial and
/// tangential positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewgram {
    pub segment: i32,
    pub view: i32,
    pub ranges: ViewRanges,
    data: Array2<Weightf32>,
}

impl Viewgram {

    pub fn zeros(segment: i32, view: i32, ranges: ViewRanges) -> Self {
        let data = Array2::zeros((ranges.axial.len(), ranges.tangential.len()));
        Self { segment, view, ranges, data }
    }

    pub fn bin(&self, pos: AxTangPos) -> Bin {
        Bin::new(self.segment, self.view, pos.axial, pos.tangential)
    }

    fn offsets(&self, AxTangPos { axial, tangential }: AxTangPos) -> Option<(usize, usize)> {
        Some((self.ranges.axial.offset(axial)?, self.ranges.tangential.offset(tangential)?))
    }

    pub fn get(&self, pos: AxTangPos) -> Option<Weightf32> {
        self.offsets(pos).map(|i| self.data[i])
    }

    /// Store `value` in the bin at `pos`. Returns `false` (and stores nothing)
    /// if `pos` lies outside the viewgram.
    pub fn set(&mut self, pos: AxTangPos, value: Weightf32) -> bool {
        match self.offsets(pos) {
            Some(i) => { self.data[i] = value; true }
            None    => false,
        }
    }

    pub fn sum(&self) -> Weightf32 { self.data.sum() }

    /// The values, indexed by `[axial offset, tangential offset]`
    pub fn data(&self) -> &Array2<Weightf32> { &self.data }
}

/// The viewgrams whose bins are related to each other by the symmetries in
/// use: the unit of work of the forward projector.
#[derive(Clone, Debug, PartialEq)]
pub struct RelatedViewgrams {
    pub basic_segment: i32,
    pub basic_view: i32,
    pub ranges: ViewRanges,
    viewgrams: Vec<Viewgram>,
}

impl RelatedViewgrams {

    /// Zero-filled viewgrams for every (segment, view) related to the basic
    /// (segment, view) pair by `symmetries`.
    pub fn zeros(
        symmetries : &dyn Symmetries,
        segment    : i32,
        view       : i32,
        ranges     : ViewRanges,
    ) -> Result<Self, SymmetryError> {
        let basic = symmetries.find_basic_bin(&Bin::new(segment, view, ranges.axial.min, ranges.tangential.min))?;
        let viewgrams = symmetries
            .related_views(basic.segment, basic.view)?
            .into_iter()
            .map(|(segment, view)| Viewgram::zeros(segment, view, ranges))
            .collect();
        Ok(Self { basic_segment: basic.segment, basic_view: basic.view, ranges, viewgrams })
    }

    /// A set made of a single viewgram, with no view symmetries
    pub fn single(viewgram: Viewgram) -> Self {
        Self {
            basic_segment: viewgram.segment,
            basic_view: viewgram.view,
            ranges: viewgram.ranges,
            viewgrams: vec![viewgram],
        }
    }

    pub fn len(&self) -> usize { self.viewgrams.len() }
    pub fn is_empty(&self) -> bool { self.viewgrams.is_empty() }

    pub fn iter    (&self)     -> std::slice::Iter   <Viewgram> { self.viewgrams.iter() }
    pub fn iter_mut(&mut self) -> std::slice::IterMut<Viewgram> { self.viewgrams.iter_mut() }

    pub fn sum(&self) -> Weightf32 { self.iter().map(Viewgram::sum).sum() }
}

impl IntoIterator for RelatedViewgrams {
    type Item = Viewgram;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.viewgrams.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinogram::PosRange;

    fn ranges() -> ViewRanges { ViewRanges::new(PosRange::new(0, 3).unwrap(), PosRange::new(-2, 2).unwrap()) }

    #[test]
    fn set_and_get_within_ranges() {
        let mut v = Viewgram::zeros(0, 1, ranges());
        assert!(v.set(AxTangPos::new(3, -2), 4.5));
        assert_eq!(v.get(AxTangPos::new(3, -2)), Some(4.5));
        assert_eq!(v.get(AxTangPos::new(0,  0)), Some(0.0));
        assert_eq!(v.sum(), 4.5);
    }

    #[test]
    fn positions_outside_ranges_are_refused() {
        let mut v = Viewgram::zeros(0, 1, ranges());
        assert!(!v.set(AxTangPos::new(4, 0), 1.0));
        assert_eq!(v.get(AxTangPos::new(0, 3)), None);
        assert_eq!(v.sum(), 0.0);
    }
}
