//! Text exports of a finished calculation. Paths ending with `.gz` are gzip-compressed.

use std::io::Write;
use std::path::Path;

use diffpeak_core_rs::loc::IntervalOp;
use diffpeak_io_rs::bed::{self, Bed5};
use diffpeak_io_rs::table;
use diffpeak_io_rs::WriteRecord;
use eyre::{Result, WrapErr};
use log::info;

use crate::peaks::Peak;
use crate::result::CallResult;
use crate::stats::histogram::{PValueHistogram, BINS};
use crate::stats::Summary;

const DELIMITER: char = ',';

fn records(contigs: &[String], peaks: &[Peak]) -> Result<Vec<Bed5>> {
    peaks
        .iter()
        .enumerate()
        .map(|(ind, peak)| {
            Bed5::new(
                contigs[*peak.contig()].clone(),
                *peak.interval(),
                format!("peak_{}", ind + 1),
                Bed5::score_from_pvalue(*peak.pvalue()),
            )
        })
        .collect()
}

/// Peaks as BED5 with names `peak_<n>` and scores derived from p-values.
pub fn write_bed<W: Write>(
    writer: &mut bed::Writer<W>,
    contigs: &[String],
    peaks: &[Peak],
) -> Result<()> {
    writer.write_records(&records(contigs, peaks)?)?;
    writer.flush()
}

/// Peaks with exact p-values, which BED scores can't carry.
pub fn write_peaks<W: Write>(
    writer: &mut table::Writer<W>,
    contigs: &[String],
    peaks: &[Peak],
) -> Result<()> {
    for (ind, peak) in peaks.iter().enumerate() {
        writer.write_row(&[
            contigs[*peak.contig()].clone(),
            peak.start().to_string(),
            peak.end().to_string(),
            format!("peak_{}", ind + 1),
            format!("{:e}", peak.pvalue()),
        ])?;
    }
    writer.flush()
}

pub const PEAKS_HEADER: [&str; 5] = ["chrom", "start", "end", "name", "pvalue"];

pub const REPLICATES_HEADER: [&str; 17] = [
    "name",
    "active",
    "weight",
    "fit_weight",
    "scaling_factor",
    "experiment_tags",
    "background_tags",
    "experiment_lambda_raw",
    "experiment_lambda",
    "background_lambda",
    "experiment_quality_median",
    "background_quality_median",
    "peak_quality_experiment_median",
    "significant_experiment_raw",
    "significant_background_raw",
    "significant_corrected",
    "overlap",
];

pub fn write_replicates<W: Write>(
    writer: &mut table::Writer<W>,
    result: &CallResult,
) -> Result<()> {
    for (ind, rep) in result.replicates().iter().enumerate() {
        let median = |x: Option<f64>| x.map(|x| x.to_string()).unwrap_or_default();
        let peak_quality = result
            .quality()
            .get(ind)
            .and_then(|x| x.experiment().as_ref().map(|x| *x.median()));
        let counters = rep.counters();

        writer.write_row(&[
            rep.name().clone(),
            rep.active().to_string(),
            rep.weight().to_string(),
            rep.fit_weight().to_string(),
            rep.scaling_factor().to_string(),
            rep.experiment().tags().to_string(),
            rep.background().tags().to_string(),
            rep.experiment().lambda_raw().to_string(),
            rep.experiment().lambda_normalized().to_string(),
            rep.background().lambda_normalized().to_string(),
            median(rep.experiment().quality().as_ref().map(|x| *x.median())),
            median(rep.background().quality().as_ref().map(|x| *x.median())),
            median(peak_quality),
            counters.experiment_raw.to_string(),
            counters.background_raw.to_string(),
            counters.corrected.to_string(),
            rep.overlap().to_string(),
        ])?;
    }
    writer.flush()
}

pub const CONTIGS_HEADER: [&str; 4] = ["chrom", "windows", "significant", "replicate_significant_median"];

pub fn write_contigs<W: Write>(writer: &mut table::Writer<W>, summary: &Summary) -> Result<()> {
    for contig in summary.contigs() {
        writer.write_row(&[
            contig.name().clone(),
            contig.windows().to_string(),
            contig.significant().to_string(),
            contig.replicate_significant().to_string(),
        ])?;
    }
    writer.flush()
}

/// One row per log10 bin, one column per replicate plus the combined distribution.
pub fn write_histograms<W: Write>(writer: &mut table::Writer<W>, result: &CallResult) -> Result<()> {
    let histograms = result
        .replicates()
        .iter()
        .map(|x| x.histogram())
        .chain([result.summary().histogram()])
        .collect::<Vec<_>>();

    for bin in 0..BINS {
        let (low, high) = PValueHistogram::bounds(bin);
        let mut row = vec![format!("{low:e}"), format!("{high:e}")];
        row.extend(histograms.iter().map(|x| x.bins()[bin].to_string()));
        writer.write_row(&row)?;
    }
    writer.flush()
}

fn histogram_header(result: &CallResult) -> Vec<String> {
    let mut header = vec!["pvalue_low".to_string(), "pvalue_high".to_string()];
    header.extend(result.replicates().iter().map(|x| x.name().clone()));
    header.push("combined".to_string());
    header
}

/// Write every export of the result into `directory`, file names start with `prefix`.
pub fn write_all(directory: impl AsRef<Path>, prefix: &str, result: &CallResult) -> Result<()> {
    let directory = directory.as_ref();
    write_files(directory, prefix, result)
        .wrap_err_with(|| format!("Failed to write exports to {}", directory.display()))?;
    info!("Exports written to {}", directory.display());
    Ok(())
}

fn write_files(directory: &Path, prefix: &str, result: &CallResult) -> Result<()> {
    let path = |name: &str| directory.join(format!("{prefix}{name}"));
    let contigs = result.contigs();

    for (kind, peaks) in [("narrow", result.narrow()), ("broad", result.broad())] {
        let mut bed = bed::Writer::from_path(path(&format!("{kind}.bed")))?;
        write_bed(&mut bed, contigs, peaks)?;
        bed.finish()?;

        let mut table =
            table::Writer::from_path(path(&format!("{kind}.csv")), DELIMITER, &PEAKS_HEADER)?;
        write_peaks(&mut table, contigs, peaks)?;
        table.finish()?;
    }

    let mut table =
        table::Writer::from_path(path("replicates.csv"), DELIMITER, &REPLICATES_HEADER)?;
    write_replicates(&mut table, result)?;
    table.finish()?;

    let mut table =
        table::Writer::from_path(path("chromosomes.csv"), DELIMITER, &CONTIGS_HEADER)?;
    write_contigs(&mut table, result.summary())?;
    table.finish()?;

    let header = histogram_header(result);
    let header = header.iter().map(|x| x.as_str()).collect::<Vec<_>>();
    let mut table = table::Writer::from_path(path("pvalues.csv"), DELIMITER, &header)?;
    write_histograms(&mut table, result)?;
    table.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffpeak_core_rs::loc::Interval;

    #[test]
    fn test_peak_exports() -> Result<()> {
        let contigs = vec!["chr1".to_string(), "chrUn_gl000220.1".to_string()];
        let peaks = vec![
            Peak::new(0, Interval::new(0, 250)?, 1e-7),
            Peak::new(1, Interval::new(100, 300)?, 0.5),
        ];

        let mut writer = bed::Writer::new(Vec::new());
        write_bed(&mut writer, &contigs, &peaks)?;
        let bed = String::from_utf8(writer.into_inner())?;
        assert_eq!(bed, "chr1\t0\t250\tpeak_1\t70\nchrUn_gl000220.1\t100\t300\tpeak_2\t3\n");

        let mut writer = table::Writer::new(Vec::new(), DELIMITER, &PEAKS_HEADER)?;
        write_peaks(&mut writer, &contigs, &peaks)?;
        let csv = String::from_utf8(writer.into_inner())?;
        assert_eq!(
            csv,
            "chrom,start,end,name,pvalue\nchr1,0,250,peak_1,1e-7\nchrUn_gl000220.1,100,300,peak_2,5e-1\n"
        );
        Ok(())
    }
}
