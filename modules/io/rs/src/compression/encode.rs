use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{Result, WrapErr};

use super::config::Config;

pub enum Stream<W: Write> {
    Raw(W),
    Gzip(flate2::write::GzEncoder<W>),
}

impl<W: Write> Stream<W> {
    pub fn new(inner: W, config: &Config) -> Self {
        match config {
            Config::Raw => Stream::Raw(inner),
            Config::Gzip(level) => Stream::Gzip(flate2::write::GzEncoder::new(
                inner,
                flate2::Compression::new(level.get() as u32),
            )),
        }
    }

    /// Write any pending compressed data and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        match self {
            Stream::Raw(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
            Stream::Gzip(encoder) => {
                let mut inner = encoder.finish()?;
                inner.flush()?;
                Ok(inner)
            }
        }
    }
}

impl<W: Write> Write for Stream<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Raw(w) => w.write(buf),
            Stream::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Raw(w) => w.flush(),
            Stream::Gzip(w) => w.flush(),
        }
    }
}

/// Create a file and wrap it into the compression stream inferred from the file extension.
pub fn infer_from_path(path: impl AsRef<Path>) -> Result<Stream<BufWriter<File>>> {
    let path = path.as_ref();
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    Ok(Stream::new(
        BufWriter::new(file),
        &Config::infer_from_path(path),
    ))
}
