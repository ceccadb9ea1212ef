use diffpeak_core_rs::source::Read;
use eyre::Result;
use noodles::{
    bam, bam::io::Reader, bgzf, core::region::Interval, csi,
    csi::binning_index::index::reference_sequence::bin::Chunk, sam::alignment::Record,
};

use super::reader::Filters;

/// Alignments overlapping the query region that pass flag/MAPQ filters.
pub struct Query<'a, R> {
    reader: Reader<csi::io::Query<'a, R>>,
    reference_sequence_id: usize,
    interval: Interval,
    record: &'a mut bam::Record,
    filters: Filters,
}

impl<'a, R> Query<'a, R>
where
    R: bgzf::io::BufRead + bgzf::io::Seek,
{
    pub fn new(
        reader: &'a mut R,
        chunks: Vec<Chunk>,
        reference_sequence_id: usize,
        interval: Interval,
        record: &'a mut bam::Record,
        filters: Filters,
    ) -> Self {
        Self {
            reader: Reader::from(csi::io::Query::new(reader, chunks)),
            reference_sequence_id,
            interval,
            record,
            filters,
        }
    }

    fn parse(&self) -> Result<Option<Read>> {
        let record = &*self.record;
        let flags: u16 = record.flags().into();
        let mapq = record.mapping_quality().map(|x| x.get()).unwrap_or(255);
        if flags & self.filters.inflags != self.filters.inflags
            || flags & self.filters.exflags != 0
            || mapq < self.filters.minmapq
        {
            return Ok(None);
        }

        match (
            record.reference_sequence_id().transpose()?,
            record.alignment_start().transpose()?,
            record.alignment_end().transpose()?,
        ) {
            (Some(id), Some(start), Some(end)) => {
                let alignment_interval = (start..=end).into();
                if id != self.reference_sequence_id || !self.interval.intersects(alignment_interval)
                {
                    return Ok(None);
                }

                // 1-based closed => 0-based half-open
                let read = Read::new(
                    (start.get() - 1) as u64,
                    end.get() as u64,
                    record.quality_scores().as_ref().to_vec(),
                )?;
                Ok(Some(read))
            }
            _ => Ok(None),
        }
    }
}

impl<R> Iterator for Query<'_, R>
where
    R: bgzf::io::BufRead + bgzf::io::Seek,
{
    type Item = Result<Read>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(self.record) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }

            match self.parse() {
                Ok(Some(read)) => return Some(Ok(read)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
