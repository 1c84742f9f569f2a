// ----------------------------------- CLI -----------------------------------
#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "fwdproj", about = "Forward project a cylindrical phantom into a sinogram")]
pub struct Cli {
    /// TOML configuration file
    pub config: PathBuf,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub threads: usize,

    /// Override the projection strategy in the config file
    #[clap(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Override the sample batch capacity in the config file
    #[clap(short, long)]
    pub capacity: Option<usize>,

    /// Report every set of related viewgrams
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg { PerBin, SymmetryCache, ChunkedBatch }

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::PerBin        => Strategy::PerBin,
            StrategyArg::SymmetryCache => Strategy::SymmetryCache,
            StrategyArg::ChunkedBatch  => Strategy::ChunkedBatch,
        }
    }
}

// --------------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let mut progress = Progress::new();

    // --- Configuration -------------------------------------------------------------
    progress.start("Reading configuration");
    let config = Config::read(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let geometry   = config.geometry()?;
    let symmetries = config.symmetries()?;
    let sampler    = config.sampler()?;
    let mut settings = config.projector_settings()?;
    if let Some(strategy) = args.strategy { settings.strategy = strategy.into(); }
    if let Some(capacity) = args.capacity { settings.capacity = capacity; }
    progress.done();
    info!(?settings, "projector settings");

    // --- Phantom: uniform cylinder along z ------------------------------------------
    progress.start("Building phantom");
    let fov = geometry.fov;
    let (radius, activity) = match &config.phantom {
        Some(Phantom { radius, activity }) => (mm_(*radius), *activity),
        None => (fov.half_width.x.min(fov.half_width.y) / 2.0, 1.0),
    };
    let image = Image::from_fn(fov, |p| if p.x * p.x + p.y * p.y <= radius * radius { activity } else { 0.0 });
    progress.done();

    // --- One unit of work per set of related viewgrams -----------------------------
    let ranges = geometry.view_ranges();
    let mut work = vec![];
    for &segment in &geometry.segments {
        for view in 0..geometry.num_views {
            let viewgrams = RelatedViewgrams::zeros(&*symmetries, segment, view, ranges)?;
            if viewgrams.basic_view == view { work.push(viewgrams) }
        }
    }
    let n_viewgrams: usize = work.iter().map(RelatedViewgrams::len).sum();
    println!("Projecting {} viewgrams of {} bins in {} related sets, with {:?}",
             group_digits(n_viewgrams), group_digits(ranges.n_bins()), work.len(), settings.strategy);

    let bar = ProgressBar::new(work.len() as u64);
    bar.set_style(ProgressStyle::default_bar()
                  .template("[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")?);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build()?;
    let results = pool.install(|| forward_project_all(
        &geometry, &sampler, symmetries.clone(), settings, ChordEngine::new, &image, work,
        |_| bar.inc(1),
    ))?;
    bar.finish_and_clear();

    // --- Report ---------------------------------------------------------------------
    let mut totals = ViewStats::default();
    let mut sinogram_sum = 0.0;
    for (viewgrams, stats) in &results {
        totals += *stats;
        sinogram_sum += viewgrams.sum();
        if args.verbose {
            for v in viewgrams.iter() {
                println!("segment {:3} view {:4}: sum {:12.3}", v.segment, v.view, v.sum());
            }
        }
    }
    let ms = |d: std::time::Duration| group_digits(d.as_millis());
    println!("Sinogram sum         : {sinogram_sum:.3}");
    println!("Rows computed        : {}", group_digits(totals.rows_computed));
    println!("Cache hits           : {}", group_digits(totals.cache_hits));
    println!("Engine calls         : {}", group_digits(totals.engine_calls));
    println!("Matrix elements      : {}", group_digits(totals.matrix_elements));
    println!("Scheduling           : {} ms", ms(totals.scheduling));
    println!("Ray tracing          : {} ms", ms(totals.ray_tracing));
    println!("Forward projection   : {} ms", ms(totals.forward_projection));
    println!("Total (all threads)  : {} ms", ms(totals.total));
    progress.done_with_message("Projection and report, wall clock");
    Ok(())
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use units::mm_;

use binproj::{
    config::fwdproj::{Config, Phantom},
    engine::ChordEngine,
    image::Image,
    projector::{Strategy, ViewStats, parallel::forward_project_all},
    sinogram::RelatedViewgrams,
    utils::{group_digits, timing::Progress},
};
