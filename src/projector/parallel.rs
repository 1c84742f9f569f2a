//! Projection of many sets of related viewgrams in parallel.
//!
//! Each rayon worker gets a `ForwardProjector` of its own (and therefore its
//! own sample batch, engine, row cache and processed-grids). Only read-only
//! data are shared between workers.

use std::sync::Arc;

use rayon::prelude::*;

use crate::engine::RayIntegralEngine;
use crate::image::Density;
use crate::lor::LorSampler;
use crate::sinogram::{RelatedViewgrams, ScannerGeometry};
use crate::symmetry::Symmetries;

use super::{ForwardProjector, ProjectorError, ProjectorSettings, ViewStats};

/// Fill every set in `work`, returning them in input order alongside the work
/// done on each. `make_engine` is called once per worker, when it receives its
/// first set; `on_done` after every completed set.
#[allow(clippy::too_many_arguments)]
pub fn forward_project_all<E, F, D>(
    geometry   : &ScannerGeometry,
    sampler    : &LorSampler,
    symmetries : Arc<dyn Symmetries>,
    settings   : ProjectorSettings,
    make_engine: F,
    density    : &dyn Density,
    work       : Vec<RelatedViewgrams>,
    on_done    : D,
) -> Result<Vec<(RelatedViewgrams, ViewStats)>, ProjectorError>
where
    E: RayIntegralEngine,
    F: Fn() -> E + Sync + Send,
    D: Fn(&ViewStats) + Sync + Send,
{
    let new_projector = || ForwardProjector::new(
        geometry.clone(),
        sampler.clone(),
        Arc::clone(&symmetries),
        make_engine(),
        settings,
    );

    work.into_par_iter()
        .map_init(|| None, |slot: &mut Option<ForwardProjector<E>>, mut viewgrams| -> Result<_, ProjectorError> {
            let projector = match slot.take() {
                Some(projector) => projector,
                None => new_projector()?,
            };
            let projector = slot.insert(projector);
            let stats = projector.forward_project(&mut viewgrams, density)?;
            on_done(&stats);
            Ok((viewgrams, stats))
        })
        .collect()
}
