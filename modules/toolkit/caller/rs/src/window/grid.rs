use std::ops::Range;

use ahash::HashMap;
use diffpeak_core_rs::loc::Interval;
use eyre::{ensure, Result};
use log::warn;

/// Chromosome names and lengths merged across dataset headers.
///
/// Chromosomes keep the order of their first appearance. A chromosome reported with conflicting
/// lengths keeps the largest one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenomeMap {
    names: Vec<String>,
    lengths: Vec<u64>,
    index: HashMap<String, usize>,
}

impl GenomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, length: u64) -> &mut Self {
        match self.index.get(name) {
            Some(&ind) => {
                if self.lengths[ind] != length {
                    warn!(
                        "Chromosome {name} has conflicting lengths: {} vs {length}, using the larger one",
                        self.lengths[ind]
                    );
                    self.lengths[ind] = self.lengths[ind].max(length);
                }
            }
            None => {
                self.index.insert(name.to_string(), self.names.len());
                self.names.push(name.to_string());
                self.lengths.push(length);
            }
        }
        self
    }

    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a [(String, u64)]>) -> Self {
        let mut genome = Self::new();
        for header in headers {
            for (name, length) in header {
                genome.add(name, *length);
            }
        }
        genome
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, contig: usize) -> &str {
        &self.names[contig]
    }

    pub fn length(&self, contig: usize) -> u64 {
        self.lengths[contig]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }
}

/// Tiling of a chromosome into windows of `size` bases started every `offset` bases.
///
/// Full windows are emitted while they fit into the chromosome. A single trailing window clipped
/// to the chromosome end follows if it is at least `size - offset` long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    size: u64,
    offset: u64,
}

impl Grid {
    pub fn new(size: u64, offset: u64) -> Result<Self> {
        ensure!(size > 0 && offset > 0, "Window size and offset must be positive");
        ensure!(offset <= size, "Window offset can't exceed the window size");
        Ok(Self { size, offset })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn full(&self, length: u64) -> u64 {
        match length >= self.size {
            true => (length - self.size) / self.offset + 1,
            false => 0,
        }
    }

    /// Number of windows on a chromosome of the given length.
    pub fn count(&self, length: u64) -> usize {
        let full = self.full(length);
        let trailing = match full {
            0 => length > 0 && length >= self.size - self.offset,
            // Trailing window starts at full * offset and ends at the chromosome end
            _ => {
                (full - 1) * self.offset + self.size < length
                    && length - full * self.offset >= self.size - self.offset
            }
        };
        (full + u64::from(trailing)) as usize
    }

    /// Total number of windows in the genome, including windows that will never hold a tag.
    pub fn total(&self, genome: &GenomeMap) -> u64 {
        genome.lengths().iter().map(|x| self.count(*x) as u64).sum()
    }

    pub fn start(&self, index: usize) -> u64 {
        index as u64 * self.offset
    }

    /// Interval of the index-th window on a chromosome of the given length.
    pub fn window(&self, length: u64, index: usize) -> Option<Interval<u64>> {
        if index >= self.count(length) {
            return None;
        }
        let start = self.start(index);
        Interval::new(start, (start + self.size).min(length)).ok()
    }

    pub fn iter(&self, length: u64) -> impl Iterator<Item = Interval<u64>> + '_ {
        (0..self.count(length)).filter_map(move |ind| self.window(length, ind))
    }

    /// Indices of windows in `within` overlapping the half-open region [start, end).
    pub fn overlapping(&self, start: u64, end: u64, within: &Range<usize>) -> Range<usize> {
        if start >= end || within.is_empty() {
            return within.start..within.start;
        }
        let first = match start < self.size {
            true => 0,
            false => ((start - self.size) / self.offset + 1) as usize,
        };
        let last = ((end - 1) / self.offset) as usize + 1;

        let first = first.clamp(within.start, within.end);
        let last = last.clamp(first, within.end);
        first..last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffpeak_core_rs::loc::IntervalOp;

    fn bounds(grid: &Grid, length: u64) -> Vec<(u64, u64)> {
        grid.iter(length).map(|x| x.into()).collect()
    }

    #[test]
    fn test_tiling() -> Result<()> {
        let grid = Grid::new(200, 50)?;
        let windows = bounds(&grid, 1030);
        assert_eq!(windows.len(), 18);
        assert_eq!(windows[0], (0, 200));
        assert_eq!(windows[16], (800, 1000));
        // Trailing window of 180 bases >= 200 - 50
        assert_eq!(windows[17], (850, 1030));

        for w in &windows[..17] {
            assert_eq!(w.1 - w.0, 200);
        }
        assert!(windows.windows(2).all(|x| x[0].0 < x[1].0));

        // No remainder after the last full window
        assert_eq!(grid.count(1000), 17);
        assert_eq!(grid.window(1000, 16), Some(Interval::new(800, 1000)?));
        assert_eq!(grid.window(1000, 17), None);
        Ok(())
    }

    #[test]
    fn test_trailing_remnant() -> Result<()> {
        let grid = Grid::new(200, 200)?;
        assert_eq!(bounds(&grid, 450), vec![(0, 200), (200, 400), (400, 450)]);
        assert_eq!(bounds(&grid, 400), vec![(0, 200), (200, 400)]);
        assert_eq!(bounds(&grid, 1), vec![(0, 1)]);

        let grid = Grid::new(200, 100)?;
        assert_eq!(bounds(&grid, 350), vec![(0, 200), (100, 300), (200, 350)]);
        assert_eq!(bounds(&grid, 400), vec![(0, 200), (100, 300), (200, 400)]);
        assert_eq!(
            bounds(&grid, 480),
            vec![(0, 200), (100, 300), (200, 400), (300, 480)]
        );
        assert_eq!(bounds(&grid, 120), vec![(0, 120)]);
        // Chromosome shorter than size - offset
        assert_eq!(bounds(&grid, 50), Vec::<(u64, u64)>::new());
        assert_eq!(grid.count(0), 0);
        Ok(())
    }

    #[test]
    fn test_overlapping() -> Result<()> {
        let grid = Grid::new(200, 50)?;
        let all = 0..grid.count(1000);

        // [0, 200), [50, 250), [100, 300), [150, 350) cover position 160
        assert_eq!(grid.overlapping(160, 161, &all), 0..4);
        assert_eq!(grid.overlapping(0, 10, &all), 0..1);
        assert_eq!(grid.overlapping(990, 1000, &all), 16..17);
        assert_eq!(grid.overlapping(160, 161, &(2..3)), 2..3);
        assert_eq!(grid.overlapping(160, 161, &(5..8)), 5..5);

        // Every reported window must overlap the region, every skipped one must not
        for (start, end) in [(0, 1), (199, 201), (420, 700), (849, 851)] {
            let hits = grid.overlapping(start, end, &all);
            for ind in all.clone() {
                let w = grid.window(1000, ind).unwrap();
                let overlaps = w.start() < end && start < w.end();
                assert_eq!(hits.contains(&ind), overlaps, "{start}-{end} vs {w}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_genome_map() {
        let first = vec![("chr1".to_string(), 1000), ("chr2".to_string(), 500)];
        let second = vec![("chr2".to_string(), 700), ("chr3".to_string(), 10)];
        let genome = GenomeMap::from_headers([first.as_slice(), second.as_slice()]);

        assert_eq!(genome.names(), &["chr1", "chr2", "chr3"]);
        assert_eq!(genome.lengths(), &[1000, 700, 10]);
        assert_eq!(genome.index_of("chr3"), Some(2));
        assert_eq!(genome.index_of("chrX"), None);
    }
}
