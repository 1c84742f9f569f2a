//! All projection strategies must fill the sinogram with the same values.

use std::sync::Arc;

use float_eq::assert_float_eq;
use ndarray::Array2;
use rstest::rstest;

use binproj::batch::WhenFull;
use binproj::engine::{ChordEngine, EngineError, EngineInput, RayIntegralEngine, OUTPUT_COLUMNS};
use binproj::fov::FOV;
use binproj::image::Image;
use binproj::lor::{Jitter, LorSampler};
use binproj::projector::{ForwardProjector, ProjectorSettings, Strategy};
use binproj::sinogram::{PosRange, RelatedViewgrams, ScannerGeometry};
use binproj::symmetry::{SinogramSymmetries, Symmetries, SymmetryGenerators};
use binproj::system_matrix::ResultFilter;

/// Every sample has the same weight as its normalization constant, in the
/// voxel that contains it.
#[derive(Clone, Copy, Debug, Default)]
struct VoxelCounter;

impl RayIntegralEngine for VoxelCounter {
    fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
        let mut out = Array2::zeros((input.capacity(), OUTPUT_COLUMNS));
        for i in 0..input.capacity() {
            out[(i, 0)] = input.norm_consts[i];
            for d in 0..3 {
                out[(i, d + 1)] = (input.positions[(i, d)] / input.voxel_size[d]).floor();
            }
        }
        Ok(out)
    }
}

#[derive(Clone, Copy, Debug)]
enum Engine { Counter, Chord }

fn geometry(segments: Vec<i32>) -> ScannerGeometry {
    let fov = FOV::new((5.0, 5.0, 4.0), (5, 5, 4));
    ScannerGeometry::new(fov, 4, PosRange::new(-2, 2).unwrap(), 1.0, 1.0, segments, 0.3).unwrap()
}

/// Values of irregular but positive density
fn image(fov: FOV) -> Image {
    Image::from_fn(fov, |p| 2.0 + 0.3 * p.x - 0.2 * p.y + 0.1 * p.x * p.z)
}

/// Project every set of related viewgrams of `geometry`, returning the values
/// of each viewgram, keyed by (segment, view)
fn project(
    geometry  : &ScannerGeometry,
    generators: SymmetryGenerators,
    rays      : usize,
    jitter    : Option<f32>,
    engine    : Engine,
    settings  : ProjectorSettings,
) -> Vec<((i32, i32), Array2<f32>)> {
    let symmetries: Arc<dyn Symmetries> = Arc::new(SinogramSymmetries::new(geometry, generators).unwrap());
    let jitter = jitter.map(|fraction| Jitter { fraction, seed: 20250101 });
    let sampler = LorSampler::new(geometry.fov, 0.3, rays, 0.5, jitter).unwrap();
    let engine: Box<dyn RayIntegralEngine> = match engine {
        Engine::Counter => Box::new(VoxelCounter),
        Engine::Chord   => Box::new(ChordEngine),
    };
    let mut projector = ForwardProjector::new(geometry.clone(), sampler, symmetries.clone(), engine, settings).unwrap();
    let density = image(geometry.fov);
    let ranges = geometry.view_ranges();

    let mut values = vec![];
    for &segment in &geometry.segments {
        for view in 0..geometry.num_views {
            let mut viewgrams = RelatedViewgrams::zeros(&*symmetries, segment, view, ranges).unwrap();
            if viewgrams.basic_view != view { continue }
            projector.forward_project(&mut viewgrams, &density).unwrap();
            values.extend(viewgrams.into_iter().map(|v| ((v.segment, v.view), v.data().clone())));
        }
    }
    values.sort_by_key(|(key, _)| *key);
    values
}

fn settings(strategy: Strategy, cache: bool, capacity: usize, when_full: WhenFull) -> ProjectorSettings {
    ProjectorSettings { strategy, cache, capacity, when_full, filter: ResultFilter::DropNonNormal }
}

const NONE  : SymmetryGenerators = SymmetryGenerators { axial_shift: false, inversion: false, quarter_turn: false };
const SHIFT : SymmetryGenerators = SymmetryGenerators { axial_shift: true , inversion: false, quarter_turn: false };
const INVERT: SymmetryGenerators = SymmetryGenerators { axial_shift: false, inversion: true , quarter_turn: false };
const TURN  : SymmetryGenerators = SymmetryGenerators { axial_shift: false, inversion: false, quarter_turn: true  };
const ALL   : SymmetryGenerators = SymmetryGenerators { axial_shift: true , inversion: true , quarter_turn: true  };

#[rstest(/**/ generators, segments      , rays, jitter   , engine         ,
         case(NONE      , vec![0]       , 1   , None     , Engine::Counter),
         case(SHIFT     , vec![0]       , 1   , None     , Engine::Counter),
         case(INVERT    , vec![0]       , 2   , None     , Engine::Counter),
         case(TURN      , vec![0]       , 2   , None     , Engine::Counter),
         case(ALL       , vec![0]       , 1   , None     , Engine::Counter),
         case(ALL       , vec![0]       , 2   , None     , Engine::Counter),
         case(ALL       , vec![-1, 0, 1], 1   , None     , Engine::Counter),
         case(ALL       , vec![0]       , 2   , None     , Engine::Chord  ),
         case(ALL       , vec![-1, 0, 1], 2   , None     , Engine::Chord  ),
         // Jittered samples of related bins are images of each other
         case(SHIFT     , vec![0]       , 2   , Some(0.5), Engine::Chord  ),
         case(INVERT    , vec![-1, 0, 1], 2   , Some(0.5), Engine::Chord  ),
         case(TURN      , vec![-1, 0, 1], 3   , Some(0.5), Engine::Chord  ),
         case(ALL       , vec![-1, 0, 1], 2   , Some(0.5), Engine::Chord  ),
         case(ALL       , vec![-1, 0, 1], 2   , Some(1.0), Engine::Counter),
)]
fn strategies_agree(generators: SymmetryGenerators, segments: Vec<i32>, rays: usize, jitter: Option<f32>, engine: Engine) {
    let geometry = geometry(segments);
    // Direct computation of every bin, without any help from symmetries
    let reference = project(&geometry, generators, rays, jitter, engine, settings(Strategy::PerBin, false, 256, WhenFull::Flush));

    for candidate in [
        settings(Strategy::PerBin       , true , 256, WhenFull::Flush ),
        settings(Strategy::SymmetryCache, true , 256, WhenFull::Flush ),
        settings(Strategy::SymmetryCache, true ,   7, WhenFull::Reject),
        settings(Strategy::ChunkedBatch , false, 256, WhenFull::Flush ),
        settings(Strategy::ChunkedBatch , false,  13, WhenFull::Reject),
    ] {
        let values = project(&geometry, generators, rays, jitter, engine, candidate);
        assert_eq!(values.len(), reference.len());
        for ((key, got), (ref_key, expected)) in values.iter().zip(&reference) {
            assert_eq!(key, ref_key);
            for (g, e) in got.iter().zip(expected) {
                assert_float_eq!(*g, *e, abs <= 1e-6, rmax <= 1e-5, "{candidate:?}: segment/view {key:?}");
            }
        }
    }
}

#[test]
fn uniform_image_values_match_chord_lengths() {
    // Segment 0, view 0: LORs parallel to x, through voxel centres, across all
    // 5 voxels of width 1 mm
    let geometry = geometry(vec![0]);
    let symmetries: Arc<dyn Symmetries> = Arc::new(SinogramSymmetries::new(&geometry, ALL).unwrap());
    let sampler = LorSampler::new(geometry.fov, 0.3, 1, 0.0, None).unwrap();
    let mut projector = ForwardProjector::new(geometry.clone(), sampler, symmetries.clone(), ChordEngine,
                                              settings(Strategy::SymmetryCache, true, 64, WhenFull::Flush)).unwrap();
    let mut viewgrams = RelatedViewgrams::zeros(&*symmetries, 0, 0, geometry.view_ranges()).unwrap();
    projector.forward_project(&mut viewgrams, &Image::ones(geometry.fov)).unwrap();
    for viewgram in viewgrams.iter() {
        for &value in viewgram.data() {
            assert_float_eq!(value, 5.0, rmax <= 1e-5);
        }
    }
}
