//! Window construction: tile the genome and count reads of every dataset into windows.
//!
//! The genome is split into independent [`Unit`]s by a [`Strategy`]. Every unit owns a disjoint
//! set of (window, dataset) cells, so units can be processed in any order by any worker. Partial
//! results are merged and frozen into a [`WindowList`] afterwards, which makes the output
//! independent of the strategy and the number of workers.

use std::cell::RefCell;
use std::ops::Range;
use std::path::Path;

use diffpeak_core_rs::parallelism::ExecutionContext;
use diffpeak_core_rs::source::Opener;
use eyre::{Result, WrapErr};
use log::{debug, info};
use thread_local::ThreadLocal;

pub use chunked::Chunked;
pub use library::Library;
pub use per_contig::PerContig;

use crate::config::{Config, ConstructionStrategy};
use crate::sources::Sources;
use crate::window::{GenomeMap, Grid, WindowList};
use worker::Worker;

mod chunked;
mod library;
mod per_contig;
mod worker;

/// Independent piece of construction work: a run of windows on one chromosome and the datasets
/// to count into them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    pub contig: usize,
    pub windows: Range<usize>,
    pub datasets: Range<usize>,
}

/// Scheduling of the construction work.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Cover every (window, dataset) cell of the genome exactly once.
    fn plan(&self, genome: &GenomeMap, grid: &Grid, datasets: usize) -> Vec<Unit>;
}

impl ConstructionStrategy {
    pub fn build(&self, chunk_size: usize) -> Box<dyn Strategy> {
        match self {
            ConstructionStrategy::Chunked => Box::new(Chunked::new(chunk_size)),
            ConstructionStrategy::PerContig => Box::new(PerContig),
        }
    }
}

/// Output of the construction stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Construction {
    pub windows: WindowList,
    pub libraries: Vec<Library>,
}

/// Read dataset headers and merge them into a single genome map.
pub fn genome(opener: &dyn Opener, paths: &[&str]) -> Result<GenomeMap> {
    let headers = paths
        .iter()
        .map(|path| {
            opener
                .chromosomes(Path::new(path))
                .wrap_err_with(|| format!("Failed to read chromosomes of {path}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(GenomeMap::from_headers(headers.iter().map(|x| x.as_slice())))
}

/// Build the window list for all datasets of the configuration.
pub fn construct(
    ctx: &ExecutionContext,
    opener: &dyn Opener,
    config: &Config,
) -> Result<Construction> {
    let paths = config
        .datasets()
        .into_iter()
        .map(|(_, path)| path)
        .collect::<Vec<_>>();
    let replicates = config.replicates().len();
    let strategy = config.strategy().build(*config.chunk_size());

    let genome = genome(opener, &paths)?;
    let grid = Grid::new(*config.window_size(), *config.window_offset())?;
    let units = strategy.plan(&genome, &grid, paths.len());
    info!(
        "Counting {} datasets over {} chromosomes: {} units ({} strategy)",
        paths.len(),
        genome.len(),
        units.len(),
        strategy.name()
    );

    let workers: ThreadLocal<RefCell<Worker>> = ThreadLocal::new();
    let sources = Sources::new(opener, &paths);

    ctx.execute_indexed(units.len(), |ind| {
        let unit = &units[ind];
        let mut worker = workers
            .get_or(|| RefCell::new(Worker::new(paths.len(), replicates)))
            .borrow_mut();

        worker.begin(unit);
        for dataset in unit.datasets.clone() {
            sources.with(dataset, |source| {
                worker.count(ctx, &genome, &grid, unit, dataset, source)
            })?;
        }
        worker.emit(&genome, &grid, unit)
    })?;

    let (parts, libraries) = Worker::collapse(
        paths.len(),
        workers.into_iter().map(|x| x.into_inner()),
    );
    let windows = WindowList::freeze(&genome, replicates, grid.total(&genome), parts)?;
    debug!(
        "Construction finished: {} non-empty windows out of {}",
        windows.len(),
        windows.grid_windows()
    );

    Ok(Construction { windows, libraries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicate::ReplicateSpec;
    use diffpeak_core_rs::loc::IntervalOp;
    use diffpeak_core_rs::source::{MemoryDataset, MemoryOpener, Read};

    fn opener() -> Result<MemoryOpener> {
        let mut exp = MemoryDataset::new();
        exp.add_chromosome("chr1", 1000).add_chromosome("chr2", 300);
        exp.add_reads(
            "chr1",
            [
                Read::new(0, 50, vec![30; 50])?,
                Read::new(160, 210, vec![20; 50])?,
                Read::new(940, 990, vec![40; 50])?,
            ],
        )?;

        let mut bg = MemoryDataset::new();
        bg.add_chromosome("chr1", 900).add_chromosome("chr3", 500);
        bg.add_reads("chr3", [Read::new(10, 20, vec![])?])?;

        let mut opener = MemoryOpener::new();
        opener.insert("exp", exp).insert("bg", bg);
        Ok(opener)
    }

    fn config(strategy: ConstructionStrategy, threads: isize) -> Result<Config> {
        let mut config = Config::new();
        config
            .add_replicate(ReplicateSpec::new("r1", "exp", "bg"))?
            .set_window(200, 50)?
            .set_chunk_size(3)?
            .set_threads(threads)?
            .set_strategy(strategy);
        Ok(config)
    }

    #[test]
    fn test_construct() -> Result<()> {
        let opener = opener()?;
        let config = config(ConstructionStrategy::Chunked, 1)?;
        let ctx = ExecutionContext::new(1)?;
        let result = construct(&ctx, &opener, &config)?;
        let windows = &result.windows;

        assert_eq!(windows.contigs(), &vec!["chr1", "chr2", "chr3"]);
        assert_eq!(windows.lengths(), &vec![1000, 300, 500]);
        // 17 + 3 + 7 windows in the grid
        assert_eq!(*windows.grid_windows(), 27);

        // [0, 50) hits window 0, [160, 210) hits windows 0..=4, [940, 990) hits windows 15 and 16
        let starts = windows
            .contig_windows(0)
            .iter()
            .map(|w| (w.start(), w.count(0)))
            .collect::<Vec<_>>();
        assert_eq!(
            starts,
            vec![(0, 2), (50, 1), (100, 1), (150, 1), (200, 1), (750, 1), (800, 1)]
        );
        assert!(windows.contig_windows(1).is_empty());
        assert_eq!(windows.contig_windows(2).len(), 1);
        assert_eq!(windows.contig_windows(2)[0].counts(), &vec![0, 1]);

        assert_eq!(*result.libraries[0].tags(), 3);
        assert_eq!(*result.libraries[1].tags(), 1);
        assert_eq!(result.libraries[0].quality().map(|x| *x.median()), Some(30.0));
        assert_eq!(result.libraries[1].quality(), None);
        Ok(())
    }

    #[test]
    fn test_strategies_and_threads_agree() -> Result<()> {
        let opener = opener()?;
        let reference = construct(
            &ExecutionContext::new(1)?,
            &opener,
            &config(ConstructionStrategy::Chunked, 1)?,
        )?;

        for strategy in [ConstructionStrategy::Chunked, ConstructionStrategy::PerContig] {
            for threads in [1, 2, 4] {
                let ctx = ExecutionContext::new(threads)?;
                let result = construct(&ctx, &opener, &config(strategy, threads as isize)?)?;
                assert_eq!(result, reference, "{strategy:?} with {threads} threads");
            }
        }
        Ok(())
    }

    #[test]
    fn test_unreadable_dataset() -> Result<()> {
        let opener = opener()?;
        let mut config = config(ConstructionStrategy::Chunked, 1)?;
        config.add_replicate(ReplicateSpec::new("r2", "missing", "bg"))?;

        let err = construct(&ExecutionContext::new(1)?, &opener, &config).unwrap_err();
        assert!(err
            .chain()
            .any(|x| x.downcast_ref::<std::io::Error>().is_some()));
        Ok(())
    }
}
