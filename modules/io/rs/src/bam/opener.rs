use std::fs::File;
use std::path::Path;

use diffpeak_core_rs::source::{Opener, ReadSource};
use eyre::{Result, WrapErr};
use log::debug;
use noodles::bam;

use super::builder::ReaderBuilder;

/// Opens indexed BAM files (`<path>.bai` must exist) with shared alignment filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BamOpener {
    inflags: u16,
    exflags: u16,
    minmapq: u8,
}

impl BamOpener {
    pub fn new(inflags: u16, exflags: u16, minmapq: u8) -> Self {
        Self {
            inflags,
            exflags,
            minmapq,
        }
    }
}

impl Default for BamOpener {
    fn default() -> Self {
        Self::new(0, ReaderBuilder::DEFAULT_EXFLAGS, 0)
    }
}

impl Opener for BamOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ReadSource>> {
        debug!("Opening BAM file {}", path.display());
        let reader = ReaderBuilder::new(path)
            .with_inflags(self.inflags)
            .with_exflags(self.exflags)
            .with_minmapq(self.minmapq)
            .build()?;
        Ok(Box::new(reader))
    }

    fn chromosomes(&self, path: &Path) -> Result<Vec<(String, u64)>> {
        let file =
            File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
        let header = bam::io::Reader::new(file)
            .read_header()
            .wrap_err_with(|| format!("Failed to read a BAM header: {}", path.display()))?;

        let chromosomes = header
            .reference_sequences()
            .iter()
            .map(|(name, sequence)| (name.to_string(), sequence.length().get() as u64))
            .collect();
        Ok(chromosomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let opener = BamOpener::default();
        for err in [
            opener.open(Path::new("/nonexistent/sample.bam")).err(),
            opener.chromosomes(Path::new("/nonexistent/sample.bam")).err(),
        ] {
            let err = err.unwrap();
            assert!(err
                .chain()
                .any(|x| x.downcast_ref::<std::io::Error>().is_some()));
        }
    }
}
