use bitcode::{Decode, Encode};
use derive_getters::Getters;
use diffpeak_core_rs::loc::IntervalOp;
use diffpeak_core_rs::parallelism::ExecutionContext;
use diffpeak_core_rs::source::{Opener, ReadSource};
use eyre::Result;
use log::info;

use super::Peak;
use crate::config::Config;
use crate::replicate::ReplicateSpec;
use crate::sources::Sources;
use crate::stats::BoxPlot;

/// Distribution of per-peak median base qualities of a replicate.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct PeakQuality {
    replicate: String,
    experiment: Option<BoxPlot>,
    background: Option<BoxPlot>,
}

/// Median base quality of reads overlapping the peak, `None` if no read carries qualities.
fn median(source: &mut dyn ReadSource, contig: &str, peak: &Peak) -> Result<Option<f64>> {
    let mut histogram = [0u64; 256];
    for read in source.query(contig, peak.start(), peak.end())? {
        for quality in read?.qualities() {
            histogram[*quality as usize] += 1;
        }
    }
    Ok(BoxPlot::from_histogram(&histogram).map(|x| *x.median()))
}

/// Summarize base qualities of every replicate dataset over the given peaks.
pub fn quality(
    ctx: &ExecutionContext,
    opener: &dyn Opener,
    config: &Config,
    contigs: &[String],
    peaks: &[Peak],
) -> Result<Vec<PeakQuality>> {
    let paths = config
        .datasets()
        .into_iter()
        .map(|(_, path)| path)
        .collect::<Vec<_>>();
    let sources = Sources::new(opener, &paths);

    let medians = ctx.map(peaks.len(), |ind| {
        let peak = &peaks[ind];
        let contig = &contigs[*peak.contig()];
        (0..paths.len())
            .map(|dataset| sources.with(dataset, |source| median(source, contig, peak)))
            .collect::<Result<Vec<_>>>()
    })?;

    let summary = |tag: usize| {
        let values = medians.iter().filter_map(|x| x[tag]).collect::<Vec<_>>();
        BoxPlot::from_unsorted(values)
    };
    let result = config
        .replicates()
        .iter()
        .enumerate()
        .map(|(ind, spec)| {
            let (exp, bg) = ReplicateSpec::tags(ind);
            PeakQuality {
                replicate: spec.name().clone(),
                experiment: summary(exp),
                background: summary(bg),
            }
        })
        .collect();
    info!("Quality summarized over {} peaks", peaks.len());
    Ok(result)
}
