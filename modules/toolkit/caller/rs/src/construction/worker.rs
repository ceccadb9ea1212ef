use diffpeak_core_rs::loc::IntervalOp;
use diffpeak_core_rs::parallelism::ExecutionContext;
use diffpeak_core_rs::source::ReadSource;
use eyre::{eyre, Result, WrapErr};

use super::{Library, Unit};
use crate::window::{GenomeMap, Grid, Window};

/// Cancellation is polled once per this many reads.
const CANCEL_CHECK_PERIOD: usize = 4096;

/// Per-thread construction state. Accumulates sparse windows and library statistics over all
/// units processed by the thread.
pub struct Worker {
    replicates: usize,
    windows: Vec<Window>,
    libraries: Vec<Library>,
    // Dense [window][dataset] counts of the current unit
    dense: Vec<u32>,
}

impl Worker {
    pub fn new(datasets: usize, replicates: usize) -> Self {
        Self {
            replicates,
            windows: Vec::new(),
            libraries: vec![Library::default(); datasets],
            dense: Vec::new(),
        }
    }

    pub fn begin(&mut self, unit: &Unit) {
        self.dense.clear();
        self.dense
            .resize(unit.windows.len() * unit.datasets.len(), 0);
    }

    pub fn count(
        &mut self,
        ctx: &ExecutionContext,
        genome: &GenomeMap,
        grid: &Grid,
        unit: &Unit,
        dataset: usize,
        source: &mut dyn ReadSource,
    ) -> Result<()> {
        let contig = genome.name(unit.contig);
        let length = genome.length(unit.contig);

        // The last unit of a chromosome also owns reads past the last window
        let start = grid.start(unit.windows.start);
        let (end, owned) = match unit.windows.end == grid.count(length) {
            true => (length, length),
            false => {
                let last = grid
                    .window(length, unit.windows.end - 1)
                    .ok_or_else(|| eyre!("Unit {unit:?} is outside of {contig}"))?;
                (last.end(), grid.start(unit.windows.end))
            }
        };

        let stride = unit.datasets.len();
        let column = dataset - unit.datasets.start;
        let library = &mut self.libraries[dataset];

        let described = source.describe();
        let reads = source
            .query(contig, start, end)
            .wrap_err_with(|| format!("Failed to query {described}:{start}-{end}"))?;
        for (ind, read) in reads.enumerate() {
            if ind % CANCEL_CHECK_PERIOD == 0 {
                ctx.check()?;
            }
            let read = read?;

            if read.start() >= start && read.start() < owned {
                library.add_read(read.mean_quality());
            }
            for window in grid.overlapping(read.start(), read.end(), &unit.windows) {
                let cell = (window - unit.windows.start) * stride + column;
                self.dense[cell] = self.dense[cell].saturating_add(1);
            }
        }
        Ok(())
    }

    /// Turn non-empty windows of the current unit into sparse windows.
    pub fn emit(&mut self, genome: &GenomeMap, grid: &Grid, unit: &Unit) -> Result<()> {
        let length = genome.length(unit.contig);
        let stride = unit.datasets.len();
        if stride == 0 {
            return Ok(());
        }

        for (offset, cells) in self.dense.chunks(stride).enumerate() {
            if cells.iter().all(|x| *x == 0) {
                continue;
            }
            let index = unit.windows.start + offset;
            let interval = grid
                .window(length, index)
                .ok_or_else(|| eyre!("Window {index} is outside of {}", genome.name(unit.contig)))?;

            let mut window = Window::new(unit.contig, interval, self.replicates);
            for (column, count) in cells.iter().enumerate() {
                if *count > 0 {
                    window.set_count(unit.datasets.start + column, *count);
                }
            }
            self.windows.push(window);
        }
        Ok(())
    }

    pub fn collapse(
        datasets: usize,
        workers: impl Iterator<Item = Self>,
    ) -> (Vec<Vec<Window>>, Vec<Library>) {
        let mut libraries = vec![Library::default(); datasets];
        let mut parts = Vec::new();
        for worker in workers {
            for (library, theirs) in libraries.iter_mut().zip(&worker.libraries) {
                library.merge(theirs);
            }
            parts.push(worker.windows);
        }
        (parts, libraries)
    }
}
