//! Lines Of Response, and the ray samples which represent them in requests to
//! the ray-integral engine.

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

use crate::fov::FOV;
use crate::sample::SamplePoint;
use crate::sinogram::Bin;
use crate::symmetry::SymmetryOperation;
use crate::types::{Lengthf32, Point, Vector};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("sampling step must be strictly positive, got {0} mm")]
    Step(Lengthf32),

    #[error("need at least one ray per LOR")]
    NoRays,

    #[error("tube width must not be negative, got {0} mm")]
    TubeWidth(Lengthf32),

    #[error("jitter must lie in [0, 1], got {0}")]
    Jitter(f32),
}

/// Line Of Response: the line along which a bin's measurement integrates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub struct Lor {
    pub midpoint: Point,
    /// Unit vector
    pub direction: Vector,
}

/// Random displacement of the samples along each ray, reproducible for any
/// given bin. Bins related by symmetry share the displacements of their basic
/// bin (see `LorSampler::sample_related`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Jitter {
    /// Maximum displacement, as a fraction of the sampling step
    pub fraction: f32,
    pub seed: u64,
}

/// The sample points of one LOR, grouped into rays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampledLor {
    pub points: Vec<SamplePoint>,
    /// Number of consecutive `points` belonging to each ray
    pub ray_lengths: Vec<usize>,
}

impl SampledLor {
    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }
}

/// Turns LORs into engine requests: a tube of `rays × rays` parallel rays
/// around the LOR, each sampled at regular steps.
///
/// The sample pattern is symmetric about the LOR's midpoint, and samples are
/// culled only in the transverse plane, so the samples of symmetry-related
/// bins are images of each other.
#[derive(Clone, Debug, PartialEq)]
pub struct LorSampler {
    fov: FOV,
    step: Lengthf32,
    rays: usize,
    tube_width: Lengthf32,
    jitter: Option<Jitter>,
}

impl LorSampler {

    pub fn new(fov: FOV, step: Lengthf32, rays: usize, tube_width: Lengthf32, jitter: Option<Jitter>) -> Result<Self, SamplingError> {
        if !(step > 0.0)          { return Err(SamplingError::Step(step)) }
        if rays == 0              { return Err(SamplingError::NoRays) }
        if !(tube_width >= 0.0)   { return Err(SamplingError::TubeWidth(tube_width)) }
        if let Some(Jitter { fraction, .. }) = jitter {
            if !(0.0..=1.0).contains(&fraction) { return Err(SamplingError::Jitter(fraction)) }
        }
        Ok(Self { fov, step, rays, tube_width, jitter })
    }

    pub fn fov   (&self) -> &FOV           { &self.fov }
    pub fn jitter(&self) -> Option<Jitter> { self.jitter }

    /// Sample `lor`, the LOR of `bin`, with `bin`'s own jitter.
    pub fn sample(&self, bin: &Bin, lor: &Lor) -> SampledLor {
        self.sample_related(lor, bin, lor, &SymmetryOperation::default())
    }

    /// Sample `lor`, which `op` obtains from `basic_lor`, the LOR of `basic`.
    /// The jitter is `basic`'s, carried over by `op`, so the samples are the
    /// images of those of `basic_lor`.
    pub fn sample_related(&self, lor: &Lor, basic: &Bin, basic_lor: &Lor, op: &SymmetryOperation) -> SampledLor {
        let d = lor.direction;
        let (u, w) = transverse_frame(d);

        let half_length = self.fov.half_diagonal();
        let n_steps = ((2.0 * half_length / self.step).ceil() as usize).max(1);
        let step = 2.0 * half_length / n_steps as f32;

        let k = self.rays;
        let offset = |i: usize| ((i as f32 + 0.5) / k as f32 - 0.5) * self.tube_width;
        let norm_const = 1.0 / (k * k) as f32;

        // Which of the basic tube's rays lands on each of ours, and whether
        // it arrives reversed
        let shifts = self.ray_shifts(basic, step);
        let (bu, bw) = transverse_frame(basic_lor.direction);
        let flipped = |b: Vector, a: Vector| op.transform_direction(b).dot(a) < 0.0;
        let mirror  = |flip: bool, i: usize| if flip { k - 1 - i } else { i };
        let (flip_u, flip_w) = (flipped(bu, u), flipped(bw, w));
        let sign = if flipped(basic_lor.direction, d) { -1.0 } else { 1.0 };

        let mut sampled = SampledLor::default();
        for (i, j) in itertools::iproduct!(0..k, 0..k) {
            let start = lor.midpoint + u * offset(i) + w * offset(j);
            let shift = sign * shifts[mirror(flip_u, i) * k + mirror(flip_w, j)];
            let before = sampled.points.len();
            for n in 0..n_steps {
                let lambda = (n as f32 + 0.5) * step - half_length + shift;
                let p = start + d * lambda;
                if self.fov.contains_xy(p) {
                    sampled.points.push(SamplePoint::new(self.fov.to_grid(p), d, norm_const));
                }
            }
            sampled.ray_lengths.push(sampled.points.len() - before);
        }
        sampled
    }

    /// Displacement along each ray of `bin`'s tube, row-major
    fn ray_shifts(&self, bin: &Bin, step: Lengthf32) -> Vec<Lengthf32> {
        let n = self.rays * self.rays;
        match self.jitter {
            None => vec![0.0; n],
            Some(Jitter { fraction, seed }) => {
                let mut rng = StdRng::seed_from_u64(bin_seed(seed, bin));
                (0..n).map(|_| (rng.gen::<f32>() - 0.5) * fraction * step).collect()
            }
        }
    }
}

/// Transverse unit vector perpendicular to `d`, and a third one completing the
/// frame
fn transverse_frame(d: Vector) -> (Vector, Vector) {
    let u = Vector::new(-d.y, d.x, 0.0).normalize();
    (u, d.cross(u))
}

/// Mix the user's seed with the bin's identity (splitmix64 finaliser)
fn bin_seed(seed: u64, bin: &Bin) -> u64 {
    let mix = |mut z: u64| {
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    };
    [bin.segment, bin.view, bin.axial, bin.tangential]
        .into_iter()
        .fold(mix(seed), |acc, c| mix(acc ^ (c as u32 as u64).wrapping_add(0x9e37_79b9_7f4a_7c15)))
}
