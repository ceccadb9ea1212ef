use std::path::PathBuf;

use eyre::{Result, WrapErr};

use super::indexed_reader::IndexedReader;
use super::reader::{Filters, Reader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderBuilder {
    filename: PathBuf,
    inflags: Option<u16>,
    exflags: Option<u16>,
    minmapq: Option<u8>,
}

impl ReaderBuilder {
    /// Unmapped, QC-failed and supplementary alignments are skipped by default.
    pub const DEFAULT_EXFLAGS: u16 = 2564;

    pub fn new<T: Into<PathBuf>>(filename: T) -> Self {
        Self {
            filename: filename.into(),
            inflags: None,
            exflags: None,
            minmapq: None,
        }
    }

    pub fn with_inflags(mut self, inflags: u16) -> Self {
        self.inflags = Some(inflags);
        self
    }

    pub fn with_exflags(mut self, exflags: u16) -> Self {
        self.exflags = Some(exflags);
        self
    }

    pub fn with_minmapq(mut self, minmapq: u8) -> Self {
        self.minmapq = Some(minmapq);
        self
    }

    pub fn build(self) -> Result<Reader> {
        let mut reader = IndexedReader::new(&self.filename)?;
        let header = reader
            .inner
            .read_header()
            .wrap_err_with(|| format!("Failed to read a BAM header: {}", self.filename.display()))?;

        let filters = Filters {
            inflags: self.inflags.unwrap_or(0),
            exflags: self.exflags.unwrap_or(Self::DEFAULT_EXFLAGS),
            minmapq: self.minmapq.unwrap_or(0),
        };
        Ok(Reader::new(self.filename, reader, header, filters))
    }
}
