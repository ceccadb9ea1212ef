use std::path::Path;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_more::Into;
use eyre::{bail, Result};

/// DEFLATE compression level in [0, 9].
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Into)]
pub struct Level(u8);

impl Level {
    pub const FAST: Level = Level(1);
    pub const DEFAULT: Level = Level(6);
    pub const BEST: Level = Level(9);

    pub fn new(level: u8) -> Result<Self> {
        if level > 9 {
            bail!("Invalid DEFLATE compression level: {}", level);
        }
        Ok(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEFAULT
    }
}

#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Config {
    #[default]
    Raw,
    Gzip(Level),
}

impl Config {
    pub fn infer_from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext {
                "gz" | "gzip" => Config::Gzip(Level::default()),
                _ => Config::Raw,
            })
            .unwrap_or(Config::Raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_path() {
        assert_eq!(Config::infer_from_path("peaks.bed"), Config::Raw);
        assert_eq!(
            Config::infer_from_path("peaks.bed.gz"),
            Config::Gzip(Level::DEFAULT)
        );
        assert_eq!(Config::infer_from_path("no-extension"), Config::Raw);
        assert!(Level::new(10).is_err());
    }
}
