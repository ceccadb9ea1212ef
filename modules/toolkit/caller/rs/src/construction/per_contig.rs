use super::{Strategy, Unit};
use crate::window::{GenomeMap, Grid};

/// One unit per (dataset, chromosome) pair. Every unit streams a whole chromosome of a single
/// dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerContig;

impl Strategy for PerContig {
    fn name(&self) -> &str {
        "per-contig"
    }

    fn plan(&self, genome: &GenomeMap, grid: &Grid, datasets: usize) -> Vec<Unit> {
        let mut units = Vec::with_capacity(datasets * genome.len());
        for dataset in 0..datasets {
            for (contig, length) in genome.lengths().iter().enumerate() {
                let windows = grid.count(*length);
                if windows == 0 {
                    continue;
                }
                units.push(Unit {
                    contig,
                    windows: 0..windows,
                    datasets: dataset..dataset + 1,
                });
            }
        }
        units
    }
}
