use derive_getters::Getters;

use crate::stats::BoxPlot;

/// Library-wide statistics of a dataset gathered while counting windows.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Library {
    /// Every read is counted once, in the unit that owns its start position.
    tags: u64,
    /// Histogram of per-read mean base qualities (Phred scores 0..=255).
    #[getter(skip)]
    qualities: Vec<u64>,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            tags: 0,
            qualities: vec![0; 256],
        }
    }
}

impl Library {
    pub fn new(tags: u64, qualities: Vec<u64>) -> Self {
        Self { tags, qualities }
    }

    pub(crate) fn add_read(&mut self, mean_quality: Option<f64>) {
        self.tags += 1;
        if let Some(quality) = mean_quality {
            let bin = quality.round().clamp(0.0, 255.0) as usize;
            self.qualities[bin] += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: &Library) {
        self.tags += other.tags;
        for (mine, theirs) in self.qualities.iter_mut().zip(&other.qualities) {
            *mine += *theirs;
        }
    }

    /// Five-number summary of per-read mean qualities, if any read carried qualities.
    pub fn quality(&self) -> Option<BoxPlot> {
        BoxPlot::from_histogram(&self.qualities)
    }
}
