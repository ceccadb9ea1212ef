use diffpeak_core_rs::parallelism::ExecutionContext;
use diffpeak_core_rs::source::Opener;
use eyre::Result;
use log::info;

use super::Progress;
use crate::config::Config;
use crate::construction::{construct, Construction};
use crate::peaks;
use crate::replicate::Replicate;
use crate::result::CallResult;
use crate::stats::{self, pipeline as stages};
use crate::window::WindowList;

const CONSTRUCTED: f64 = 0.25;
const ESTIMATED: f64 = 0.45;
const CORRECTED: f64 = 0.60;
const COMBINED: f64 = 0.65;
const ASSEMBLED: f64 = 0.90;

/// State of a finished job required to recalculate it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cache {
    pub config: Config,
    pub windows: WindowList,
    pub replicates: Vec<Replicate>,
}

/// Full run: construction, Poisson models, raw p-values and everything downstream.
pub(crate) fn start(
    ctx: &ExecutionContext,
    opener: &dyn Opener,
    config: &Config,
    progress: &Progress,
) -> Result<(Cache, CallResult)> {
    info!("Starting a new calculation with {} replicates", config.replicates().len());
    let Construction {
        mut windows,
        libraries,
    } = construct(ctx, opener, config)?;
    progress.advance(CONSTRUCTED);

    let mut replicates = stages::estimate(ctx, config, &windows, &libraries)?;
    progress.advance(ESTIMATED);

    stages::raw_pvalues(ctx, config, &mut windows, &mut replicates)?;
    let result = finish(ctx, opener, config, &mut windows, &mut replicates, progress)?;

    let cache = Cache {
        config: config.clone(),
        windows,
        replicates,
    };
    Ok((cache, result))
}

/// Re-run corrections, combination and peak assembly over cached raw p-values.
pub(crate) fn recalculate(
    ctx: &ExecutionContext,
    opener: &dyn Opener,
    cache: &mut Cache,
    progress: &Progress,
) -> Result<CallResult> {
    let Cache {
        config,
        windows,
        replicates,
    } = cache;
    for (replicate, spec) in replicates.iter_mut().zip(config.replicates()) {
        replicate.resolve_weight(spec, *config.fit_weights());
    }
    info!("Recalculating {} cached windows", windows.len());
    finish(ctx, opener, config, windows, replicates, progress)
}

fn finish(
    ctx: &ExecutionContext,
    opener: &dyn Opener,
    config: &Config,
    windows: &mut WindowList,
    replicates: &mut [Replicate],
    progress: &Progress,
) -> Result<CallResult> {
    stages::qvalues(ctx, config, windows, replicates)?;
    progress.advance(CORRECTED);

    let rho = stages::combine(ctx, config, windows, replicates)?;
    progress.advance(COMBINED);

    let summary = stats::summarize(ctx, windows, replicates, *config.cutoff(), rho)?;
    let narrow = peaks::narrow(windows, *config.cutoff());
    let broad = peaks::broad(&narrow, *config.window_size());
    let quality = match config.quality_counting() {
        true => peaks::quality(ctx, opener, config, windows.contigs(), &narrow)?,
        false => Vec::new(),
    };
    progress.advance(ASSEMBLED);
    info!("Called {} narrow and {} broad peaks", narrow.len(), broad.len());

    let result = CallResult::new(
        windows.contigs().clone(),
        narrow,
        broad,
        replicates.to_vec(),
        quality,
        summary,
    );
    progress.advance(1.0);
    Ok(result)
}
