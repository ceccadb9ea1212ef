use super::{Strategy, Unit};
use crate::window::{GenomeMap, Grid};

/// Split every chromosome into runs of at most `chunk_size` windows. Each unit counts all
/// datasets, so a worker touches every dataset for each chunk it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunked {
    chunk_size: usize,
}

impl Chunked {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Strategy for Chunked {
    fn name(&self) -> &str {
        "chunked"
    }

    fn plan(&self, genome: &GenomeMap, grid: &Grid, datasets: usize) -> Vec<Unit> {
        let mut units = Vec::new();
        for (contig, length) in genome.lengths().iter().enumerate() {
            let windows = grid.count(*length);
            let mut start = 0;
            while start < windows {
                let end = (start + self.chunk_size).min(windows);
                units.push(Unit {
                    contig,
                    windows: start..end,
                    datasets: 0..datasets,
                });
                start = end;
            }
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan() -> eyre::Result<()> {
        let mut genome = GenomeMap::new();
        genome.add("chr1", 1000).add("chr2", 10).add("chr3", 300);
        let grid = Grid::new(200, 50)?;

        let units = Chunked::new(10).plan(&genome, &grid, 4);
        let expected = vec![
            Unit { contig: 0, windows: 0..10, datasets: 0..4 },
            Unit { contig: 0, windows: 10..17, datasets: 0..4 },
            Unit { contig: 2, windows: 0..3, datasets: 0..4 },
        ];
        assert_eq!(units, expected);
        Ok(())
    }
}
