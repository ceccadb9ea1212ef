use derive_getters::{Dissolve, Getters};
use eyre::{ensure, Result};

use crate::loc::{Interval, IntervalOp};

/// Aligned read as seen by the engine: a half-open reference span and its base qualities.
#[derive(Clone, PartialEq, Eq, Debug, Dissolve, Getters)]
pub struct Read {
    interval: Interval<u64>,
    qualities: Vec<u8>,
}

impl Read {
    pub fn new(start: u64, end: u64, qualities: Vec<u8>) -> Result<Self> {
        ensure!(start < end, "Read must span at least one base: [{start}, {end})");
        Ok(Self {
            interval: Interval::new(start, end)?,
            qualities,
        })
    }

    /// Mean base quality of the read, None if qualities are missing.
    pub fn mean_quality(&self) -> Option<f64> {
        if self.qualities.is_empty() {
            return None;
        }
        let total: u64 = self.qualities.iter().map(|x| *x as u64).sum();
        Some(total as f64 / self.qualities.len() as f64)
    }
}

impl IntervalOp for Read {
    type Idx = u64;

    #[inline(always)]
    fn start(&self) -> Self::Idx {
        self.interval.start()
    }

    #[inline(always)]
    fn end(&self) -> Self::Idx {
        self.interval.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() -> Result<()> {
        let read = Read::new(10, 20, vec![30, 40])?;
        assert_eq!(read.len(), 10);
        assert_eq!(read.mean_quality(), Some(35.0));
        assert_eq!(Read::new(10, 20, vec![])?.mean_quality(), None);
        assert!(Read::new(20, 20, vec![]).is_err());
        Ok(())
    }
}
