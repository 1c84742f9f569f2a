//! The view-projection functions between which `ForwardProjector::new` chooses.

use crate::engine::RayIntegralEngine;
use crate::image::Density;
use crate::processed::AlreadyProcessed;
use crate::sinogram::{Bin, RelatedViewgrams, Viewgram};
use crate::symmetry::SymmetryOperation;

use super::{ForwardProjector, Phase, ProjectorError};

/// Each bin on its own. With the cache, rows are shared between bins with the
/// same basic bin; without it, symmetries are ignored altogether.
pub(super) fn per_bin<E: RayIntegralEngine>(
    p        : &mut ForwardProjector<E>,
    viewgrams: &mut RelatedViewgrams,
    density  : &dyn Density,
) -> Result<(), ProjectorError> {
    let ranges = viewgrams.ranges;
    for viewgram in viewgrams.iter_mut() {
        let mut processed = AlreadyProcessed::new(ranges);
        for pos in ranges.positions() {
            let bin = viewgram.bin(pos);
            if p.settings.cache {
                let (basic, op) = p.symmetries.find_symmetry_operation_from_basic_bin(&bin)?;
                let row = p.basic_row(&basic)?;
                p.apply_row(&row, &op, viewgram, &bin, density);
            } else {
                p.transition(Phase::Scheduling);
                let row = p.compute_row(&bin)?;
                p.apply_row(&row, &SymmetryOperation::default(), viewgram, &bin, density);
            }
            processed.mark(pos);
        }
        ForwardProjector::<E>::check_complete(&processed, viewgram)?;
    }
    Ok(())
}

/// Walk the basic viewgram; for every position not yet covered, compute the
/// row of its basic bin and apply it to all related bins of all viewgrams.
/// One processed-grid is shared by the whole set.
pub(super) fn symmetry_cache<E: RayIntegralEngine>(
    p        : &mut ForwardProjector<E>,
    viewgrams: &mut RelatedViewgrams,
    density  : &dyn Density,
) -> Result<(), ProjectorError> {
    let ranges = viewgrams.ranges;
    let (segment, view) = (viewgrams.basic_segment, viewgrams.basic_view);
    let mut processed = AlreadyProcessed::new(ranges);

    for pos in ranges.positions() {
        if processed.is_marked(pos) { continue }
        let basic = p.symmetries.find_basic_bin(&Bin::new(segment, view, pos.axial, pos.tangential))?;
        let row = p.basic_row(&basic)?;
        for related in p.symmetries.related_bins(&basic, &ranges) {
            if !processed.mark(related) { continue }
            for viewgram in viewgrams.iter_mut() {
                let bin = viewgram.bin(related);
                let (from, op) = p.symmetries.find_symmetry_operation_from_basic_bin(&bin)?;
                debug_assert_eq!(from, basic, "{bin} is not related to {basic}");
                p.apply_row(&row, &op, viewgram, &bin, density);
            }
        }
    }

    for viewgram in viewgrams.iter() {
        ForwardProjector::<E>::check_complete(&processed, viewgram)?;
    }
    Ok(())
}

/// Schedule every bin of the set before asking for any results, then split
/// the results between the bins in scheduling order.
pub(super) fn chunked_batch<E: RayIntegralEngine>(
    p        : &mut ForwardProjector<E>,
    viewgrams: &mut RelatedViewgrams,
    density  : &dyn Density,
) -> Result<(), ProjectorError> {
    let ranges = viewgrams.ranges;

    p.transition(Phase::Scheduling);
    let mut scheduled = Vec::with_capacity(viewgrams.len() * ranges.n_bins());
    for (v, viewgram) in viewgrams.iter().enumerate() {
        for pos in ranges.positions() {
            let bin = viewgram.bin(pos);
            let sampled = p.schedule_bin(&bin)?;
            scheduled.push((v, bin, sampled));
        }
    }

    p.transition(Phase::Dispatched);
    let results = p.drain()?;
    p.transition(Phase::Reducing);

    let mut targets: Vec<&mut Viewgram> = viewgrams.iter_mut().collect();
    let mut processed = vec![AlreadyProcessed::new(ranges); targets.len()];
    let mut offset = 0;
    for (v, bin, sampled) in scheduled {
        let n = sampled.len();
        let row = p.build_row(&results[offset..offset + n], &sampled);
        offset += n;
        p.apply_row(&row, &SymmetryOperation::default(), &mut *targets[v], &bin, density);
        processed[v].mark(bin.ax_tang());
    }
    debug_assert_eq!(offset, results.len());

    for (grid, viewgram) in processed.iter().zip(targets) {
        ForwardProjector::<E>::check_complete(grid, viewgram)?;
    }
    Ok(())
}
