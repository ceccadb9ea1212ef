use std::ffi::OsString;
use std::fs::File;
use std::path::Path;

use derive_getters::Dissolve;
use eyre::{Result, WrapErr};
use noodles::{bam, bgzf, csi::BinningIndex};

#[derive(Dissolve)]
pub struct IndexedReader<R> {
    pub inner: bam::io::Reader<R>,
    pub index: Box<dyn BinningIndex + Send + Sync>,
}

impl IndexedReader<bgzf::io::Reader<File>> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut index = OsString::from(path);
        index.push(".");
        index.push("bai");

        let index = bam::bai::read(&index)
            .wrap_err_with(|| format!("Failed to read BAM index for {}", path.display()))?;
        let file =
            File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            inner: bam::io::Reader::new(file),
            index: Box::new(index),
        })
    }
}
