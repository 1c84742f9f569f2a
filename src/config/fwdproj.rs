//! Configuration file parser for forward projection

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, de};
use thiserror::Error;

use units::{Length, mm_};

use crate::batch::WhenFull;
use crate::fov::FOV;
use crate::lor::{Jitter, LorSampler, SamplingError};
use crate::projector::{ProjectorSettings, Strategy};
use crate::sinogram::{PosRange, ScannerGeometry};
use crate::sinogram::geometry::GeometryError;
use crate::symmetry::{SinogramSymmetries, Symmetries, SymmetryError, SymmetryGenerators};
use crate::system_matrix::ResultFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file `{path}`")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error("{0}")]
    Invalid(String),
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ConfigError> { Err(ConfigError::Invalid(message.into())) }

fn deserialize_uom_opt<'d, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom<'d, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse::<T>()
        .map_err(de::Error::custom)
}

fn deserialize_uom_3d<'d, D, T>(deserializer: D) -> Result<(T, T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y, z) = <(String, String, String)>::deserialize(deserializer)?;
    tr_tup_res((x.parse(), y.parse(), z.parse())).map_err(de::Error::custom)
}

/// Transpose 3-tuple of `Result`
///
/// `Ok` if all elements `Ok`; if any element is an `Err` return the first one.
fn tr_tup_res<O, E>((x,y,z): (Result<O, E>, Result<O, E>, Result<O, E>)) -> Result<(O, O, O), E> {
    Ok((x?, y?, z?))
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub image: Image,
    pub scanner: Scanner,
    pub sampling: Sampling,

    #[serde(default)]
    pub symmetries: SymmetryGenerators,

    #[serde(default)]
    pub batch: Batch,

    #[serde(default)]
    pub engine: Engine,

    #[serde(default)]
    pub projector: Projector,

    /// Only used by the `fwdproj` executable
    pub phantom: Option<Phantom>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Image {
    pub nvoxels: (usize, usize, usize),
    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub fov_size: (Length, Length, Length),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scanner {
    pub views: i32,
    /// Inclusive range of tangential positions
    pub tangential: (i32, i32),
    #[serde(deserialize_with = "deserialize_uom")]
    pub tangential_spacing: Length,
    #[serde(deserialize_with = "deserialize_uom")]
    pub axial_spacing: Length,
    #[serde(default = "default_segments")]
    pub segments: Vec<i32>,
    /// Tangent of the polar angle gained per segment
    #[serde(default)]
    pub segment_slope: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Batch {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub when_full: WhenFull,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Engine {
    #[serde(default)]
    pub results: ResultFilter,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Projector {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "yes")]
    pub cache: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Sampling {
    #[serde(deserialize_with = "deserialize_uom")]
    pub step: Length,
    #[serde(default = "default_rays")]
    pub rays: usize,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub tube_width: Option<Length>,
    /// Maximum displacement of the samples along each ray, as a fraction of
    /// the step
    pub jitter: Option<f32>,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Phantom {
    #[serde(deserialize_with = "deserialize_uom")]
    pub radius: Length,
    #[serde(default = "default_activity")]
    pub activity: f32,
}

fn default_segments() -> Vec<i32> { vec![0] }
fn default_capacity() -> usize    { 4096 }
fn default_rays    () -> usize    { 1 }
fn default_activity() -> f32      { 1.0 }
fn yes             () -> bool     { true }

impl Default for Batch {
    fn default() -> Self { Self { capacity: default_capacity(), when_full: WhenFull::default() } }
}

impl Default for Projector {
    fn default() -> Self { Self { strategy: Strategy::default(), cache: yes() } }
}

impl FromStr for Config {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(toml::from_str(s)?) }
}

impl Config {

    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        text.parse()
    }

    pub fn fov(&self) -> Result<FOV, ConfigError> {
        let (nx, ny, nz) = self.image.nvoxels;
        if nx == 0 || ny == 0 || nz == 0 { return invalid(format!("image.nvoxels must all be positive: {:?}", self.image.nvoxels)) }
        let (dx, dy, dz) = self.image.fov_size;
        let size = (mm_(dx), mm_(dy), mm_(dz));
        if !(size.0 > 0.0 && size.1 > 0.0 && size.2 > 0.0) { return invalid(format!("image.fov_size must all be positive: {size:?} mm")) }
        Ok(FOV::new(size, self.image.nvoxels))
    }

    pub fn geometry(&self) -> Result<ScannerGeometry, ConfigError> {
        let s = &self.scanner;
        let (t_min, t_max) = s.tangential;
        let tangential = PosRange::new(t_min, t_max)
            .map_err(|e| ConfigError::Invalid(format!("scanner.tangential: {e}")))?;
        if s.segments.is_empty() { return invalid("scanner.segments must not be empty") }
        Ok(ScannerGeometry::new(
            self.fov()?,
            s.views,
            tangential,
            mm_(s.tangential_spacing),
            mm_(s.axial_spacing),
            s.segments.clone(),
            s.segment_slope,
        )?)
    }

    pub fn symmetries(&self) -> Result<Arc<dyn Symmetries>, ConfigError> {
        Ok(Arc::new(SinogramSymmetries::new(&self.geometry()?, self.symmetries)?))
    }

    pub fn sampler(&self) -> Result<LorSampler, ConfigError> {
        let s = &self.sampling;
        let tube_width = s.tube_width.map_or(0.0, mm_);
        let jitter = s.jitter.map(|fraction| Jitter { fraction, seed: s.seed });
        Ok(LorSampler::new(self.fov()?, mm_(s.step), s.rays, tube_width, jitter)?)
    }

    pub fn projector_settings(&self) -> Result<ProjectorSettings, ConfigError> {
        if self.batch.capacity == 0 { return invalid("batch.capacity must be at least 1") }
        Ok(ProjectorSettings {
            strategy : self.projector.strategy,
            cache    : self.projector.cache,
            capacity : self.batch.capacity,
            when_full: self.batch.when_full,
            filter   : self.engine.results,
        })
    }
}
