use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bitcode::{Decode, Encode};
use derive_getters::{Dissolve, Getters};
use diffpeak_io_rs::compression::{decode, encode, Config as Compression, Level};
use eyre::{ensure, Result, WrapErr};

use crate::config::Config;
use crate::replicate::Replicate;
use crate::window::WindowList;

const MAGIC: &[u8; 4] = b"DPK1";

/// Everything needed to recalculate a finished job in a fresh process.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters, Dissolve)]
pub struct Snapshot {
    config: Config,
    replicates: Vec<Replicate>,
    windows: WindowList,
}

impl Snapshot {
    pub fn new(config: Config, replicates: Vec<Replicate>, windows: WindowList) -> Result<Self> {
        let snapshot = Self {
            config,
            replicates,
            windows,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        self.windows.validate()?;
        ensure!(
            self.replicates.len() == self.config.replicates().len()
                && self.replicates.len() == *self.windows.replicates(),
            "Snapshot replicates don't match the window list"
        );
        Ok(())
    }

    /// Write as a gzip-compressed bitcode stream.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        let mut stream = encode::Stream::new(BufWriter::new(file), &Compression::Gzip(Level::DEFAULT));

        stream.write_all(MAGIC)?;
        stream.write_all(&bitcode::encode(self))?;
        stream.finish()?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
        let mut stream = decode::Stream::new(BufReader::new(file), &Compression::Gzip(Level::DEFAULT));

        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        if !bytes.starts_with(MAGIC) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a diffpeak snapshot", path.display()),
            )
            .into());
        }

        let snapshot: Self = bitcode::decode(&bytes[MAGIC.len()..])
            .wrap_err_with(|| format!("Corrupted snapshot {}", path.display()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
