use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use diffpeak_core_rs::loc::IntervalOp;
use eyre::Result;

use super::Bed5;
use crate::compression::encode;
use crate::WriteRecord;

pub struct Writer<W: Write> {
    writer: W,
}

impl Writer<encode::Stream<BufWriter<File>>> {
    /// Create a BED file, gzip-compressed if the path ends with `.gz`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(encode::infer_from_path(path)?))
    }

    pub fn finish(self) -> Result<()> {
        self.writer.finish()?;
        Ok(())
    }
}

impl<W: Write> Writer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WriteRecord for Writer<W> {
    type Record = Bed5;

    fn write_record(&mut self, record: &Self::Record) -> Result<()> {
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}",
            record.seqid(),
            record.interval().start(),
            record.interval().end(),
            record.name(),
            record.score()
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
