use std::path::Path;

use eyre::Result;

use super::read::Read;

/// Reads overlapping a queried region, in ascending order of their start positions.
pub type Reads<'borrow> = Box<dyn 'borrow + Iterator<Item = Result<Read>>>;

/// Handle to one opened aligned-read container. Handles are not shared between threads: every
/// worker opens its own copy through an [`Opener`].
pub trait ReadSource: Send {
    /// Human-readable description of the underlying dataset (usually the path).
    fn describe(&self) -> String;

    /// All reads overlapping the half-open region [start, end) of the given contig.
    /// Unknown contigs yield no reads.
    fn query<'borrow>(&'borrow mut self, contig: &str, start: u64, end: u64)
        -> Result<Reads<'borrow>>;
}

/// Entry point to a family of aligned-read containers (e.g. indexed BAM files).
pub trait Opener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ReadSource>>;

    /// Contigs and their lengths as declared in the container header, in the header order.
    fn chromosomes(&self, path: &Path) -> Result<Vec<(String, u64)>>;
}
