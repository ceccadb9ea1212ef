use std::fs::File;
use std::path::PathBuf;

use derive_getters::{Dissolve, Getters};
use diffpeak_core_rs::source::{ReadSource, Reads};
use eyre::Result;
use noodles::core::position::Position;
use noodles::core::region::Interval;
use noodles::{bam, bgzf, sam};

use super::{indexed_reader::IndexedReader, query::Query};

/// SAM flag and mapping quality filters applied to every alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filters {
    pub inflags: u16,
    pub exflags: u16,
    pub minmapq: u8,
}

#[derive(Dissolve, Getters)]
pub struct Reader {
    filename: PathBuf,
    #[getter(skip)]
    inner: IndexedReader<bgzf::io::Reader<File>>,
    header: sam::Header,
    #[getter(skip)]
    record: bam::Record,
    filters: Filters,
}

impl Reader {
    pub(super) fn new(
        filename: PathBuf,
        inner: IndexedReader<bgzf::io::Reader<File>>,
        header: sam::Header,
        filters: Filters,
    ) -> Self {
        Self {
            filename,
            inner,
            header,
            record: bam::Record::default(),
            filters,
        }
    }
}

impl ReadSource for Reader {
    fn describe(&self) -> String {
        self.filename.display().to_string()
    }

    fn query<'borrow>(
        &'borrow mut self,
        contig: &str,
        start: u64,
        end: u64,
    ) -> Result<Reads<'borrow>> {
        let reference_sequence_id = match self
            .header
            .reference_sequences()
            .get_index_of(contig.as_bytes())
        {
            Some(id) => id,
            // Chromosome is known to other datasets only
            None => return Ok(Box::new(std::iter::empty())),
        };

        let interval = Interval::from(
            Position::try_from(start as usize + 1)?..=Position::try_from(end as usize)?,
        );
        let chunks = self.inner.index.query(reference_sequence_id, interval)?;

        Ok(Box::new(Query::new(
            self.inner.inner.get_mut(),
            chunks,
            reference_sequence_id,
            interval,
            &mut self.record,
            self.filters,
        )))
    }
}
