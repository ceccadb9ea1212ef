use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use eyre::{Result, WrapErr};

use super::config::Config;

pub enum Stream<R: Read> {
    Raw(R),
    Gzip(flate2::read::MultiGzDecoder<R>),
}

impl<R: Read> Stream<R> {
    pub fn new(inner: R, config: &Config) -> Self {
        match config {
            Config::Raw => Stream::Raw(inner),
            Config::Gzip(_) => Stream::Gzip(flate2::read::MultiGzDecoder::new(inner)),
        }
    }
}

impl<R: Read> Read for Stream<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Raw(r) => r.read(buf),
            Stream::Gzip(r) => r.read(buf),
        }
    }
}

pub fn infer_from_path(path: impl AsRef<Path>) -> Result<Stream<BufReader<File>>> {
    let path = path.as_ref();
    let file =
        File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    Ok(Stream::new(
        BufReader::new(file),
        &Config::infer_from_path(path),
    ))
}
