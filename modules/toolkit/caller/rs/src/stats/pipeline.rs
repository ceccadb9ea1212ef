//! Stages of the statistical pipeline. Every stage is a barrier: it finishes for all windows
//! before the next one starts. Parallel stages hand out disjoint window ranges, shared counters
//! are atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use diffpeak_core_rs::parallelism::ExecutionContext;
use eyre::{ensure, eyre, Result};
use log::{info, warn};

use super::combine::Combiner;
use super::poisson::PoissonModel;
use super::qvalue::correct;
use crate::config::Config;
use crate::construction::Library;
use crate::replicate::{Dataset, Replicate, ReplicateSpec};
use crate::window::WindowList;
use crate::Error;

// Windows processed between cancellation checks
const CHECK_PERIOD: usize = 16_384;

struct Fit {
    histogram: Vec<f64>,
    lambda: f64,
    distance: f64,
}

/// Normalized tag-count histogram of a dataset over all grid windows, its mean and the distance
/// to the fitted Poisson model. Counts above `max_count` are left out of the histogram.
fn fit(windows: &WindowList, tag: usize, max_count: usize) -> Result<Fit> {
    let grid = *windows.grid_windows();
    let mut histogram = vec![0u64; max_count + 1];
    let (mut total, mut nonzero) = (0u64, 0u64);
    for window in windows.windows() {
        let count = window.count(tag) as usize;
        if count == 0 {
            continue;
        }
        total += count as u64;
        nonzero += 1;
        if count <= max_count {
            histogram[count] += 1;
        }
    }
    histogram[0] = grid.saturating_sub(nonzero);

    let histogram = histogram
        .into_iter()
        .map(|x| x as f64 / grid as f64)
        .collect::<Vec<_>>();
    let lambda = total as f64 / grid as f64;
    let distance = PoissonModel::new(lambda)?.least_squares_distance(&histogram);
    Ok(Fit {
        histogram,
        lambda,
        distance,
    })
}

/// Library scaling, raw Poisson fits, fitted weights and normalized λ of every replicate.
pub fn estimate(
    ctx: &ExecutionContext,
    config: &Config,
    windows: &WindowList,
    libraries: &[Library],
) -> Result<Vec<Replicate>> {
    let specs = config.replicates();
    ensure!(
        libraries.len() == windows.tags() && specs.len() == *windows.replicates(),
        "Window list doesn't match the configured replicates"
    );
    if *windows.grid_windows() == 0 {
        return Err(Error::Configuration(
            "None of the chromosomes is long enough to hold a window".to_string(),
        )
        .into());
    }

    let max_count = *config.histogram_max_count();
    let fits = ctx.map(windows.tags(), |tag| fit(windows, tag, max_count))?;

    let mut fits = fits.into_iter();
    let mut replicates = Vec::with_capacity(specs.len());
    for (ind, spec) in specs.iter().enumerate() {
        let (exp, bg) = ReplicateSpec::tags(ind);
        let (expfit, bgfit) = fits
            .next()
            .zip(fits.next())
            .ok_or_else(|| eyre!("Missing Poisson fits for replicate {}", spec.name()))?;

        let mut experiment = Dataset::new(
            exp,
            spec.experiment().clone(),
            *libraries[exp].tags(),
            libraries[exp].quality(),
        );
        let mut background = Dataset::new(
            bg,
            spec.background().clone(),
            *libraries[bg].tags(),
            libraries[bg].quality(),
        );

        let scaling = match (*experiment.tags(), *background.tags()) {
            (0, _) | (_, 0) => {
                warn!(
                    "Replicate {} has an empty dataset, library scaling is disabled",
                    spec.name()
                );
                1.0
            }
            (e, b) => b as f64 / e as f64,
        };
        let fit_weight = 1.0 / (1.0 + (expfit.distance + bgfit.distance) / 2.0);

        experiment.set_lambda_normalized(expfit.lambda * scaling);
        experiment.set_model(expfit.histogram, expfit.lambda, expfit.distance);
        background.set_lambda_normalized(bgfit.lambda);
        background.set_model(bgfit.histogram, bgfit.lambda, bgfit.distance);

        let mut replicate = Replicate::new(spec, experiment, background);
        replicate.set_scaling(scaling, fit_weight);
        replicate.resolve_weight(spec, *config.fit_weights());
        info!(
            "Replicate {}: scaling {scaling:.4}, λ exp {:.4}, λ bg {:.4}, fit weight {fit_weight:.4}",
            spec.name(),
            replicate.experiment().lambda_normalized(),
            replicate.background().lambda_normalized(),
        );
        replicates.push(replicate);
    }
    Ok(replicates)
}

/// Per-replicate raw p-values of scaled experiment counts. Background p-values are only counted.
pub fn raw_pvalues(
    ctx: &ExecutionContext,
    config: &Config,
    windows: &mut WindowList,
    replicates: &mut [Replicate],
) -> Result<()> {
    let models = replicates
        .iter()
        .map(|r| {
            Ok((
                PoissonModel::new(*r.experiment().lambda_normalized())?,
                PoissonModel::new(*r.background().lambda_normalized())?,
                *r.scaling_factor(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    let cutoff = *config.cutoff();
    let experiment = (0..models.len()).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
    let background = (0..models.len()).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();

    ctx.execute_mut(windows.windows_mut(), |_, chunk| {
        let mut local = vec![(0, 0); models.len()];
        for (ind, window) in chunk.iter_mut().enumerate() {
            if ind % CHECK_PERIOD == 0 {
                ctx.check()?;
            }
            for (r, (exp, bg, scaling)) in models.iter().enumerate() {
                let (etag, btag) = ReplicateSpec::tags(r);
                let pvalue = exp.pvalue(window.count(etag) as f64 * scaling);
                window.set_pvalue(r, pvalue);

                local[r].0 += u64::from(pvalue <= cutoff);
                local[r].1 += u64::from(bg.pvalue(window.count(btag) as f64) <= cutoff);
            }
        }
        for (r, (e, b)) in local.into_iter().enumerate() {
            experiment[r].fetch_add(e, Ordering::Relaxed);
            background[r].fetch_add(b, Ordering::Relaxed);
        }
        Ok(())
    })?;

    for (r, replicate) in replicates.iter_mut().enumerate() {
        let counters = replicate.counters_mut();
        counters.experiment_raw = experiment[r].load(Ordering::Relaxed);
        counters.background_raw = background[r].load(Ordering::Relaxed);
    }
    Ok(())
}

/// Correct raw p-values of every replicate, active or not.
pub fn qvalues(
    ctx: &ExecutionContext,
    config: &Config,
    windows: &mut WindowList,
    replicates: &mut [Replicate],
) -> Result<()> {
    let (method, seed) = (*config.qvalue_method(), *config.bootstrap_seed());
    let corrected = ctx.map(replicates.len(), |r| {
        let pvalues = windows
            .windows()
            .iter()
            .map(|w| w.pvalue(r))
            .collect::<Vec<_>>();
        Ok(correct(method, &pvalues, seed.wrapping_add(r as u64)))
    })?;

    ctx.execute_mut(windows.windows_mut(), |offset, chunk| {
        for (ind, window) in chunk.iter_mut().enumerate() {
            if ind % CHECK_PERIOD == 0 {
                ctx.check()?;
            }
            for (r, values) in corrected.iter().enumerate() {
                window.set_qvalue(r, values[offset + ind]);
            }
        }
        Ok(())
    })?;

    let cutoff = *config.cutoff();
    for (replicate, values) in replicates.iter_mut().zip(&corrected) {
        replicate.counters_mut().corrected = values.iter().filter(|q| **q <= cutoff).count() as u64;
    }
    Ok(())
}

/// Combine per-replicate q-values of every window and correct the combined p-values.
/// Returns the replicate correlation, if it was estimated.
pub fn combine(
    ctx: &ExecutionContext,
    config: &Config,
    windows: &mut WindowList,
    replicates: &[Replicate],
) -> Result<Option<f64>> {
    let mut combiner = Combiner::new(
        replicates
            .iter()
            .enumerate()
            .filter(|(_, r)| r.participates())
            .map(|(ind, r)| (ind, *r.weight())),
    )?;
    match combiner.participants() {
        0 => warn!("No replicate is active with a positive weight, combined p-values are 1"),
        1 => info!("Single participating replicate, its q-values are reported as combined"),
        n => {
            if *config.correlation() {
                combiner.estimate_correlation(ctx, windows.windows())?;
            }
            info!("Combining {n} replicates");
        }
    }

    ctx.execute_mut(windows.windows_mut(), |_, chunk| {
        for (ind, window) in chunk.iter_mut().enumerate() {
            if ind % CHECK_PERIOD == 0 {
                ctx.check()?;
            }
            let pvalue = combiner.combine(window);
            window.set_combined(pvalue);
        }
        Ok(())
    })?;

    let combined = windows
        .windows()
        .iter()
        .map(|w| w.combined_pvalue())
        .collect::<Vec<_>>();
    let seed = config
        .bootstrap_seed()
        .wrapping_add(replicates.len() as u64);
    let corrected = correct(*config.qvalue_method(), &combined, seed);
    ctx.execute_mut(windows.windows_mut(), |offset, chunk| {
        for (ind, window) in chunk.iter_mut().enumerate() {
            window.set_combined_qvalue(corrected[offset + ind]);
        }
        Ok(())
    })?;

    Ok(combiner.rho())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{GenomeMap, Window};
    use diffpeak_core_rs::loc::Interval;

    fn setup(counts: &[[u32; 4]]) -> Result<(Config, WindowList, Vec<Library>)> {
        let mut config = Config::new();
        config
            .add_replicate(ReplicateSpec::new("a", "a.exp", "a.bg"))?
            .add_replicate(ReplicateSpec::new("b", "b.exp", "b.bg"))?;

        let mut genome = GenomeMap::new();
        genome.add("chr1", 100_000);

        let mut libraries = vec![Library::default(); 4];
        let mut windows = Vec::new();
        for (ind, counts) in counts.iter().enumerate() {
            let start = ind as u64 * 200;
            let mut window = Window::new(0, Interval::new(start, start + 200)?, 2);
            for (tag, count) in counts.iter().enumerate() {
                window.set_count(tag, *count);
                for _ in 0..*count {
                    libraries[tag].add_read(None);
                }
            }
            windows.push(window);
        }
        let list = WindowList::freeze(&genome, 2, 500, [windows])?;
        Ok((config, list, libraries))
    }

    #[test]
    fn test_estimate() -> Result<()> {
        let ctx = ExecutionContext::new(2)?;
        // Background libraries are twice as large as experiments
        let (config, windows, libraries) = setup(&[[1, 2, 5, 10], [1, 2, 5, 10], [0, 0, 10, 20]])?;
        let replicates = estimate(&ctx, &config, &windows, &libraries)?;

        let a = &replicates[0];
        assert_eq!(*a.scaling_factor(), 2.0);
        assert_eq!(*a.experiment().lambda_raw(), 2.0 / 500.0);
        assert_eq!(*a.experiment().lambda_normalized(), 4.0 / 500.0);
        assert_eq!(*a.background().lambda_normalized(), 4.0 / 500.0);
        assert_eq!(a.experiment().histogram()[0], 498.0 / 500.0);
        assert_eq!(a.experiment().histogram()[1], 2.0 / 500.0);
        assert!(*a.fit_weight() > 0.0 && *a.fit_weight() <= 1.0);
        assert_eq!(*a.weight(), 1.0);

        assert_eq!(*replicates[1].experiment().tags(), 20);
        assert_eq!(*replicates[1].background().tags(), 40);
        Ok(())
    }

    #[test]
    fn test_empty_genome_is_rejected() -> Result<()> {
        let ctx = ExecutionContext::new(1)?;
        let (config, _, libraries) = setup(&[])?;
        let windows = WindowList::freeze(&GenomeMap::new(), 2, 0, Vec::<Vec<Window>>::new())?;
        let err = estimate(&ctx, &config, &windows, &libraries).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Configuration(_))));
        Ok(())
    }

    #[test]
    fn test_stages() -> Result<()> {
        let ctx = ExecutionContext::new(2)?;
        let mut counts = vec![[1, 1, 1, 1]; 200];
        counts[17] = [40, 1, 35, 1];
        let (mut config, mut windows, libraries) = setup(&counts)?;
        config.set_cutoff(1e-3)?;

        let mut replicates = estimate(&ctx, &config, &windows, &libraries)?;
        raw_pvalues(&ctx, &config, &mut windows, &mut replicates)?;
        qvalues(&ctx, &config, &mut windows, &mut replicates)?;
        let rho = combine(&ctx, &config, &mut windows, &replicates)?;
        assert!(rho.is_some());

        let hit = &windows.windows()[17];
        assert!(hit.pvalue(0) < 1e-10 && hit.pvalue(1) < 1e-10);
        assert!(hit.qvalue(0) >= hit.pvalue(0));
        assert!(hit.combined_qvalue() <= 1e-3);
        for (ind, window) in windows.windows().iter().enumerate() {
            if ind != 17 {
                assert!(window.combined_qvalue() > 1e-3);
            }
        }
        assert_eq!(replicates[0].counters().experiment_raw, 1);
        assert_eq!(replicates[0].counters().corrected, 1);
        Ok(())
    }
}
