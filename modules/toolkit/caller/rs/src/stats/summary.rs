use bitcode::{Decode, Encode};
use derive_getters::Getters;
use diffpeak_core_rs::num::quantile;
use diffpeak_core_rs::parallelism::ExecutionContext;
use eyre::Result;
use log::info;

use super::histogram::{AtomicHistogram, PValueHistogram};
use crate::replicate::Replicate;
use crate::window::WindowList;

#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct ContigSummary {
    name: String,
    windows: u64,
    /// Windows passing the cutoff after combination.
    significant: u64,
    /// Median over replicates of windows passing the cutoff per replicate.
    replicate_significant: f64,
}

/// Genome-wide quality statistics of a finished calculation.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct Summary {
    contigs: Vec<ContigSummary>,
    /// Distribution of combined p-values before the final correction.
    histogram: PValueHistogram,
    significant: u64,
    grid_windows: u64,
    rho: Option<f64>,
}

struct Partial {
    summary: ContigSummary,
    significant: Vec<u64>,
    overlap: Vec<u64>,
}

/// Collect p-value histograms, per-chromosome counts and replicate overlap ratios.
pub fn summarize(
    ctx: &ExecutionContext,
    windows: &WindowList,
    replicates: &mut [Replicate],
    cutoff: f64,
    rho: Option<f64>,
) -> Result<Summary> {
    let count = replicates.len();
    let combined = AtomicHistogram::default();
    let histograms = (0..count)
        .map(|_| AtomicHistogram::default())
        .collect::<Vec<_>>();

    let partials = ctx.map(windows.contigs().len(), |contig| {
        let mut local = vec![PValueHistogram::default(); count + 1];
        let mut significant = vec![0; count];
        let mut overlap = vec![0; count];
        let mut global = 0;

        let contig_windows = windows.contig_windows(contig);
        for window in contig_windows {
            let passed = window.combined_qvalue() <= cutoff;
            global += u64::from(passed);
            for r in 0..count {
                local[r].add(window.pvalue(r));
                if window.qvalue(r) <= cutoff {
                    significant[r] += 1;
                    overlap[r] += u64::from(passed);
                }
            }
            local[count].add(window.combined_pvalue());
        }

        for (shared, local) in histograms.iter().chain([&combined]).zip(&local) {
            shared.merge(local);
        }

        let mut sorted = significant.iter().map(|x| *x as f64).collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);
        Ok(Partial {
            summary: ContigSummary {
                name: windows.contigs()[contig].clone(),
                windows: contig_windows.len() as u64,
                significant: global,
                replicate_significant: quantile(&sorted, 0.5).unwrap_or(0.0),
            },
            significant,
            overlap,
        })
    })?;

    let total: u64 = partials.iter().map(|x| x.summary.significant).sum();
    for (r, (replicate, histogram)) in replicates.iter_mut().zip(histograms).enumerate() {
        let overlap: u64 = partials.iter().map(|x| x.overlap[r]).sum();
        let ratio = match total {
            0 => 0.0,
            _ => overlap as f64 / total as f64,
        };
        let significant: u64 = partials.iter().map(|x| x.significant[r]).sum();
        info!(
            "Replicate {}: {significant} significant windows, overlap with the combined call {:.3}",
            replicate.name(),
            ratio
        );
        replicate.set_summary(histogram.into_inner(), ratio);
    }
    info!("{total} windows are significant after combination");

    Ok(Summary {
        contigs: partials.into_iter().map(|x| x.summary).collect(),
        histogram: combined.into_inner(),
        significant: total,
        grid_windows: *windows.grid_windows(),
        rho,
    })
}
