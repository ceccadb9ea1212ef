use std::ops::Range;

use bitcode::{Decode, Encode};
use derive_getters::Getters;
use diffpeak_core_rs::loc::IntervalOp;
use eyre::{ensure, Result};
use log::{debug, warn};

use super::{GenomeMap, Window};

/// Frozen, chromosome-ordered collection of non-empty windows.
///
/// Windows are grouped by chromosome (in genome map order) and sorted by start within each
/// chromosome. `ranges[c]` is the half-open index range of windows on the c-th chromosome.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct WindowList {
    contigs: Vec<String>,
    lengths: Vec<u64>,
    #[getter(skip)]
    windows: Vec<Window>,
    #[getter(skip)]
    ranges: Vec<(usize, usize)>,
    replicates: usize,
    grid_windows: u64,
}

impl WindowList {
    /// Merge partial construction results into the final ordered list.
    ///
    /// Windows sharing a (chromosome, start) key are unioned slot by slot. Empty windows are
    /// dropped.
    pub fn freeze(
        genome: &GenomeMap,
        replicates: usize,
        grid_windows: u64,
        parts: impl IntoIterator<Item = Vec<Window>>,
    ) -> Result<Self> {
        let mut windows: Vec<Window> = parts.into_iter().flatten().collect();
        for w in &windows {
            ensure!(
                *w.contig() < genome.len(),
                "Window {} refers to unknown chromosome {}",
                w.interval(),
                w.contig()
            );
            ensure!(
                w.replicates() == replicates,
                "Window {} has {} replicate slots, expected {replicates}",
                w.interval(),
                w.replicates()
            );
        }
        windows.sort_by_key(|w| (*w.contig(), w.start()));

        // Union duplicates in place
        let mut merged: Vec<Window> = Vec::with_capacity(windows.len());
        let mut duplicates = 0;
        for window in windows {
            match merged.last_mut() {
                Some(last) if last.contig() == window.contig() && last.start() == window.start() => {
                    last.union(&window);
                    duplicates += 1;
                }
                _ => merged.push(window),
            }
        }
        merged.retain(|w| w.total() > 0);
        if duplicates > 0 {
            debug!("Merged {duplicates} duplicated windows");
        }

        let mut ranges = vec![(0, 0); genome.len()];
        let mut cursor = 0;
        for (contig, range) in ranges.iter_mut().enumerate() {
            let start = cursor;
            while cursor < merged.len() && *merged[cursor].contig() == contig {
                cursor += 1;
            }
            *range = (start, cursor);
        }

        let list = Self {
            contigs: genome.names().to_vec(),
            lengths: genome.lengths().to_vec(),
            windows: merged,
            ranges,
            replicates,
            grid_windows,
        };
        if list.is_empty() {
            warn!("None of the windows received a tag");
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub(crate) fn windows_mut(&mut self) -> &mut [Window] {
        &mut self.windows
    }

    /// Number of datasets (tag slots) per window.
    pub fn tags(&self) -> usize {
        2 * self.replicates
    }

    pub fn range(&self, contig: usize) -> Range<usize> {
        let (start, end) = self.ranges[contig];
        start..end
    }

    pub fn contig_windows(&self, contig: usize) -> &[Window] {
        &self.windows[self.range(contig)]
    }

    /// Structural invariants that must hold for any list, including decoded snapshots.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.contigs.len() == self.lengths.len() && self.contigs.len() == self.ranges.len(),
            "Chromosome tables have inconsistent sizes"
        );

        let mut expected = 0;
        for (contig, (start, end)) in self.ranges.iter().enumerate() {
            ensure!(
                *start == expected && start <= end && *end <= self.windows.len(),
                "Broken index range for chromosome {}",
                self.contigs[contig]
            );
            expected = *end;

            let windows = &self.windows[*start..*end];
            for w in windows {
                ensure!(
                    *w.contig() == contig && w.end() <= self.lengths[contig],
                    "Window {} is misplaced on {}",
                    w.interval(),
                    self.contigs[contig]
                );
                ensure!(
                    w.counts().len() == self.tags()
                        && w.pvalues().len() == self.replicates + 1
                        && w.qvalues().len() == self.replicates + 1,
                    "Window {} has malformed vectors",
                    w.interval()
                );
                ensure!(w.total() > 0, "Window {} is empty", w.interval());
            }
            ensure!(
                windows.windows(2).all(|x| x[0].start() < x[1].start()),
                "Windows on {} are not sorted",
                self.contigs[contig]
            );
        }
        ensure!(expected == self.windows.len(), "Windows outside of chromosome ranges");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffpeak_core_rs::loc::Interval;

    fn window(contig: usize, start: u64, tag: usize, count: u32) -> Window {
        let mut w = Window::new(contig, Interval::new(start, start + 100).unwrap(), 1);
        w.set_count(tag, count);
        w
    }

    #[test]
    fn test_freeze() -> Result<()> {
        let mut genome = GenomeMap::new();
        genome.add("chr1", 1000).add("chr2", 1000).add("chr3", 1000);

        let parts = vec![
            vec![window(1, 300, 0, 1), window(0, 200, 0, 2), window(0, 0, 1, 0)],
            vec![window(0, 200, 1, 5), window(1, 100, 1, 1)],
        ];
        let list = WindowList::freeze(&genome, 1, 30, parts)?;
        list.validate()?;

        assert_eq!(list.len(), 3);
        assert_eq!(list.range(0), 0..1);
        assert_eq!(list.range(1), 1..3);
        assert_eq!(list.range(2), 3..3);
        assert_eq!(list.contig_windows(0)[0].counts(), &vec![2, 5]);
        assert_eq!(
            list.contig_windows(1)
                .iter()
                .map(|x| x.start())
                .collect::<Vec<_>>(),
            vec![100, 300]
        );
        assert_eq!(*list.grid_windows(), 30);
        Ok(())
    }

    #[test]
    fn test_freeze_rejects_foreign_windows() {
        let mut genome = GenomeMap::new();
        genome.add("chr1", 1000);
        assert!(WindowList::freeze(&genome, 1, 10, vec![vec![window(3, 0, 0, 1)]]).is_err());
    }
}
