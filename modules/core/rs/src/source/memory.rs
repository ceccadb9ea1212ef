use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use eyre::{ensure, eyre, Result};

use crate::loc::IntervalOp;

use super::read::Read;
use super::source::{Opener, ReadSource, Reads};

#[derive(Clone, Debug, Default)]
struct ContigReads {
    reads: Vec<Read>,
    longest: u64,
}

/// In-memory aligned-read container. Useful for tests, benchmarks and simulated data.
#[derive(Clone, Debug, Default)]
pub struct MemoryDataset {
    chromosomes: Vec<(String, u64)>,
    reads: AHashMap<String, ContigReads>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chromosome(&mut self, name: impl Into<String>, length: u64) -> &mut Self {
        let name = name.into();
        match self.chromosomes.iter_mut().find(|(x, _)| *x == name) {
            Some((_, len)) => *len = length,
            None => self.chromosomes.push((name, length)),
        }
        self
    }

    pub fn add_read(&mut self, contig: &str, read: Read) -> Result<&mut Self> {
        let length = self
            .chromosomes
            .iter()
            .find(|(x, _)| x == contig)
            .map(|(_, len)| *len)
            .ok_or_else(|| eyre!("Unknown chromosome: {contig}"))?;
        ensure!(
            read.end() <= length,
            "Read [{}, {}) exceeds the length of {contig} ({length})",
            read.start(),
            read.end()
        );

        let entry = self.reads.entry(contig.to_string()).or_default();
        entry.longest = entry.longest.max(read.len());
        entry.reads.push(read);
        Ok(self)
    }

    pub fn add_reads(
        &mut self,
        contig: &str,
        reads: impl IntoIterator<Item = Read>,
    ) -> Result<&mut Self> {
        for read in reads {
            self.add_read(contig, read)?;
        }
        Ok(self)
    }

    fn sorted(mut self) -> Self {
        for contig in self.reads.values_mut() {
            contig.reads.sort_by_key(|x| (x.start(), x.end()));
        }
        self
    }
}

/// Opens [`MemoryDataset`]s registered under virtual paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryOpener {
    datasets: AHashMap<PathBuf, Arc<MemoryDataset>>,
    delay: Option<Duration>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: MemoryDataset) -> &mut Self {
        self.datasets.insert(path.into(), Arc::new(dataset.sorted()));
        self
    }

    /// Sleep before answering every query. Emulates slow storage.
    pub fn with_delay(&mut self, delay: Duration) -> &mut Self {
        self.delay = Some(delay);
        self
    }

    fn get(&self, path: &Path) -> Result<&Arc<MemoryDataset>> {
        match self.datasets.get(path) {
            Some(dataset) => Ok(dataset),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Dataset is not available: {}", path.display()),
            )
            .into()),
        }
    }
}

impl Opener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ReadSource>> {
        let dataset = self.get(path)?.clone();
        Ok(Box::new(MemorySource {
            path: path.to_path_buf(),
            dataset,
            delay: self.delay,
        }))
    }

    fn chromosomes(&self, path: &Path) -> Result<Vec<(String, u64)>> {
        Ok(self.get(path)?.chromosomes.clone())
    }
}

struct MemorySource {
    path: PathBuf,
    dataset: Arc<MemoryDataset>,
    delay: Option<Duration>,
}

impl ReadSource for MemorySource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn query<'borrow>(
        &'borrow mut self,
        contig: &str,
        start: u64,
        end: u64,
    ) -> Result<Reads<'borrow>> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let contig = match self.dataset.reads.get(contig) {
            Some(x) => x,
            None => return Ok(Box::new(std::iter::empty())),
        };

        // Reads are sorted by start => skip everything that ends before the region for sure
        let lower = start.saturating_sub(contig.longest);
        let first = contig.reads.partition_point(|x| x.start() < lower);
        let reads = contig.reads[first..]
            .iter()
            .take_while(move |x| x.start() < end)
            .filter(move |x| x.end() > start)
            .map(|x| Ok(x.clone()));
        Ok(Box::new(reads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Result<MemoryDataset> {
        let mut dataset = MemoryDataset::new();
        dataset.add_chromosome("chr1", 1000).add_chromosome("chr2", 50);
        dataset.add_reads(
            "chr1",
            [
                Read::new(500, 600, vec![])?,
                Read::new(0, 100, vec![])?,
                Read::new(95, 105, vec![])?,
                Read::new(100, 150, vec![])?,
            ],
        )?;
        Ok(dataset)
    }

    #[test]
    fn test_query() -> Result<()> {
        let mut opener = MemoryOpener::new();
        opener.insert("a.bam", dataset()?);

        let mut source = opener.open(Path::new("a.bam"))?;
        let reads = source.query("chr1", 100, 200)?.collect::<Result<Vec<_>>>()?;
        let starts = reads.iter().map(|x| x.start()).collect::<Vec<_>>();
        assert_eq!(starts, vec![95, 100]);

        assert_eq!(source.query("chr1", 0, 1000)?.count(), 4);
        assert_eq!(source.query("chr2", 0, 50)?.count(), 0);
        assert_eq!(source.query("chrX", 0, 50)?.count(), 0);
        assert_eq!(
            opener.chromosomes(Path::new("a.bam"))?,
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 50)]
        );
        Ok(())
    }

    #[test]
    fn test_missing_dataset() -> Result<()> {
        let opener = MemoryOpener::new();
        let err = opener.open(Path::new("missing.bam")).err().unwrap();
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|x| x.kind()),
            Some(io::ErrorKind::NotFound)
        );

        let mut dataset = dataset()?;
        assert!(dataset.add_read("chr2", Read::new(10, 60, vec![])?).is_err());
        assert!(dataset.add_read("chr3", Read::new(10, 60, vec![])?).is_err());
        Ok(())
    }
}
