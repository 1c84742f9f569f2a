//! Symmetry-aware forward projection of a density image into sinogram bins.
//!
//! The unit of work is a set of `RelatedViewgrams`. For every bin, a
//! system-matrix row is needed: it is obtained by sampling the bin's LOR,
//! sending the samples through the `Dispatcher` to the ray-integral engine,
//! and reducing the engine's answers to a `SystemMatrixRow`. Rows of bins
//! related by the `Symmetries` are images of each other, so rows can be
//! computed once per basic bin and remapped.
//!
//! How this is organized is decided once per projector, by its `Strategy`:
//!
//! + `PerBin`: every bin is handled on its own. With the row cache enabled,
//!   rows are looked up (or computed) by basic bin and remapped.
//!
//! + `SymmetryCache`: for each basic bin, compute its row once and use it for
//!   every related bin in every viewgram of the set.
//!
//! + `ChunkedBatch`: schedule the samples of every bin of the set, drain the
//!   dispatcher once, then build and apply all rows.

pub mod parallel;
mod strategy;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::batch::{DispatchError, DispatchStats, Dispatcher, WhenFull};
use crate::engine::RayIntegralEngine;
use crate::image::Density;
use crate::lor::{LorSampler, SampledLor};
use crate::processed::AlreadyProcessed;
use crate::sample::RayIntegral;
use crate::sinogram::{Bin, RelatedViewgrams, ScannerGeometry, Viewgram};
use crate::symmetry::{Symmetries, SymmetryError, SymmetryOperation};
use crate::system_matrix::{ResultFilter, SystemMatrixRow};

#[derive(Error, Debug)]
pub enum ProjectorError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),

    #[error("segment {segment} view {view}: {marked} of {expected} bins processed")]
    IncompleteView { segment: i32, view: i32, marked: usize, expected: usize },
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    PerBin,
    #[default]
    SymmetryCache,
    ChunkedBatch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectorSettings {
    pub strategy: Strategy,
    /// Row cache keyed by basic bin, for `Strategy::PerBin`. The other
    /// strategies decide for themselves.
    pub cache: bool,
    pub capacity: usize,
    pub when_full: WhenFull,
    pub filter: ResultFilter,
}

impl Default for ProjectorSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            cache: true,
            capacity: 4096,
            when_full: WhenFull::default(),
            filter: ResultFilter::default(),
        }
    }
}

/// Where a projector is in the processing of a view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scheduling,
    Dispatched,
    Reducing,
}

impl Phase {
    pub fn can_become(self, next: Phase) -> bool {
        use Phase::*;
        matches!((self, next),
                 (Idle      , Scheduling) |
                 (Scheduling, Dispatched) |
                 // cache hit
                 (Scheduling, Reducing  ) |
                 (Dispatched, Reducing  ) |
                 (Reducing  , Scheduling) |
                 (Reducing  , Idle      ))
    }
}

/// Work done while projecting one set of related viewgrams
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewStats {
    pub scheduling: Duration,
    pub ray_tracing: Duration,
    pub forward_projection: Duration,
    pub total: Duration,
    pub rows_computed: usize,
    pub cache_hits: usize,
    pub engine_calls: usize,
    pub matrix_elements: usize,
}

impl std::ops::AddAssign for ViewStats {
    fn add_assign(&mut self, other: Self) {
        self.scheduling         += other.scheduling;
        self.ray_tracing        += other.ray_tracing;
        self.forward_projection += other.forward_projection;
        self.total              += other.total;
        self.rows_computed      += other.rows_computed;
        self.cache_hits         += other.cache_hits;
        self.engine_calls       += other.engine_calls;
        self.matrix_elements    += other.matrix_elements;
    }
}

fn ms(d: Duration) -> f64 { d.as_secs_f64() * 1e3 }

type ProjectView<E> = fn(&mut ForwardProjector<E>, &mut RelatedViewgrams, &dyn Density) -> Result<(), ProjectorError>;

/// Owns everything that mutates during projection: one per thread.
pub struct ForwardProjector<E> {
    geometry: ScannerGeometry,
    sampler: LorSampler,
    symmetries: Arc<dyn Symmetries>,
    dispatcher: Dispatcher<E>,
    settings: ProjectorSettings,
    project_view: ProjectView<E>,
    cache: HashMap<Bin, SystemMatrixRow>,
    phase: Phase,
    stats: ViewStats,
}

impl<E: RayIntegralEngine> ForwardProjector<E> {

    pub fn new(
        geometry  : ScannerGeometry,
        sampler   : LorSampler,
        symmetries: Arc<dyn Symmetries>,
        engine    : E,
        settings  : ProjectorSettings,
    ) -> Result<Self, ProjectorError> {
        let voxel_size = sampler.fov().voxel_size.to_array();
        let dispatcher = Dispatcher::new(engine, settings.capacity, voxel_size, settings.when_full)?;
        let project_view: ProjectView<E> = match settings.strategy {
            Strategy::PerBin        => strategy::per_bin,
            Strategy::SymmetryCache => strategy::symmetry_cache,
            Strategy::ChunkedBatch  => strategy::chunked_batch,
        };
        Ok(Self {
            geometry, sampler, symmetries, dispatcher, settings, project_view,
            cache: HashMap::new(),
            phase: Phase::Idle,
            stats: ViewStats::default(),
        })
    }

    pub fn phase           (&self) -> Phase              { self.phase }
    pub fn dispatcher_stats(&self) -> DispatchStats      { self.dispatcher.stats() }

    /// Fill every bin of every viewgram in `viewgrams` with the forward
    /// projection of `density`.
    pub fn forward_project(
        &mut self,
        viewgrams: &mut RelatedViewgrams,
        density: &dyn Density,
    ) -> Result<ViewStats, ProjectorError> {
        let start = Instant::now();
        let before = self.dispatcher.stats();
        self.stats = ViewStats::default();
        self.cache.clear();

        let outcome = (self.project_view)(self, viewgrams, density);
        if let Err(e) = outcome {
            // Whatever the failure, the next view starts from scratch
            self.dispatcher.discard();
            self.phase = Phase::Idle;
            tracing::warn!(segment = viewgrams.basic_segment, view = viewgrams.basic_view, "projection failed: {e}");
            return Err(e)
        }
        self.transition(Phase::Idle);

        let after = self.dispatcher.stats();
        self.stats.engine_calls = after.engine_calls - before.engine_calls;
        self.stats.ray_tracing  = after.engine_time  - before.engine_time;
        self.stats.total = start.elapsed();

        let s = &self.stats;
        tracing::info!(
            segment = viewgrams.basic_segment,
            view    = viewgrams.basic_view,
            scheduling_ms         = ms(s.scheduling),
            ray_tracing_ms        = ms(s.ray_tracing),
            forward_projection_ms = ms(s.forward_projection),
            total_ms              = ms(s.total),
            matrix_elements       = s.matrix_elements,
            "projected view"
        );
        Ok(self.stats)
    }

    // ----- Building blocks for the strategies -------------------------------------

    fn transition(&mut self, next: Phase) {
        debug_assert!(self.phase.can_become(next), "illegal phase transition {:?} -> {next:?}", self.phase);
        self.phase = next;
    }

    /// Sample `bin`'s LOR and hand the samples to the dispatcher
    fn schedule_bin(&mut self, bin: &Bin) -> Result<SampledLor, ProjectorError> {
        let start = Instant::now();
        let engine_before = self.dispatcher.stats().engine_time;
        let lor = self.geometry.lor(bin);
        let sampled = if self.sampler.jitter().is_some() {
            // Related bins must get images of the basic bin's jittered samples
            let (basic, op) = self.symmetries.find_symmetry_operation_from_basic_bin(bin)?;
            self.sampler.sample_related(&lor, &basic, &self.geometry.lor(&basic), &op)
        } else {
            self.sampler.sample(bin, &lor)
        };
        self.dispatcher.schedule_all(sampled.points.iter().copied())?;
        // Batches that filled up were sent to the engine along the way
        let engine = self.dispatcher.stats().engine_time - engine_before;
        self.stats.scheduling += start.elapsed().saturating_sub(engine);
        Ok(sampled)
    }

    fn drain(&mut self) -> Result<Vec<RayIntegral>, ProjectorError> {
        Ok(self.dispatcher.drain()?)
    }

    fn build_row(&mut self, results: &[RayIntegral], sampled: &SampledLor) -> SystemMatrixRow {
        self.stats.rows_computed += 1;
        SystemMatrixRow::from_ray_integrals(results, &sampled.ray_lengths, self.settings.filter)
    }

    /// Compute `bin`'s row from scratch. Leaves the projector `Reducing`.
    fn compute_row(&mut self, bin: &Bin) -> Result<SystemMatrixRow, ProjectorError> {
        let sampled = self.schedule_bin(bin)?;
        self.transition(Phase::Dispatched);
        let results = self.drain()?;
        self.transition(Phase::Reducing);
        tracing::debug!(%bin, samples = results.len(), "computed row");
        Ok(self.build_row(&results, &sampled))
    }

    /// The row of a basic bin, from the cache if possible. Leaves the
    /// projector `Reducing`.
    fn basic_row(&mut self, basic: &Bin) -> Result<SystemMatrixRow, ProjectorError> {
        self.transition(Phase::Scheduling);
        if let Some(row) = self.cache.get(basic) {
            let row = row.clone();
            self.stats.cache_hits += 1;
            self.transition(Phase::Reducing);
            return Ok(row)
        }
        let row = self.compute_row(basic)?;
        self.cache.insert(*basic, row.clone());
        Ok(row)
    }

    /// Remap `row` with `op`, forward project it for `bin` and store the value
    fn apply_row(
        &mut self,
        row     : &SystemMatrixRow,
        op      : &SymmetryOperation,
        viewgram: &mut Viewgram,
        bin     : &Bin,
        density : &dyn Density,
    ) {
        let start = Instant::now();
        let value = if op.is_identity() {
            self.stats.matrix_elements += row.len();
            density.forward_project(row, bin)
        } else {
            let row = row.transformed(op);
            self.stats.matrix_elements += row.len();
            density.forward_project(&row, bin)
        };
        viewgram.set(bin.ax_tang(), value);
        self.stats.forward_projection += start.elapsed();
    }

    fn check_complete(processed: &AlreadyProcessed, viewgram: &Viewgram) -> Result<(), ProjectorError> {
        processed.check_complete().map_err(|(marked, expected)| ProjectorError::IncompleteView {
            segment: viewgram.segment,
            view: viewgram.view,
            marked,
            expected,
        })
    }
}
