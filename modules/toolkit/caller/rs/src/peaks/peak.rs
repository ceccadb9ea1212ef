use bitcode::{Decode, Encode};
use derive_getters::{Dissolve, Getters};
use diffpeak_core_rs::loc::{Interval, IntervalOp};

use crate::window::Window;

/// Merged run of significant windows.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters, Dissolve)]
pub struct Peak {
    contig: usize,
    interval: Interval<u64>,
    pvalue: f64,
}

impl Peak {
    pub fn new(contig: usize, interval: Interval<u64>, pvalue: f64) -> Self {
        Self {
            contig,
            interval,
            pvalue,
        }
    }

    /// Peaks are mergeable if they are on the same chromosome and overlap or touch.
    pub fn is_mergeable(&self, other: &Peak) -> bool {
        self.contig == other.contig
            && (self.interval.intersects(&other.interval) || self.interval.touches(&other.interval))
    }

    /// Absorb another peak on the same chromosome: cover both intervals, keep the best p-value.
    pub fn absorb(&mut self, other: &Peak) {
        debug_assert_eq!(self.contig, other.contig);
        self.interval = self.interval.envelope(&other.interval);
        self.pvalue = self.pvalue.min(other.pvalue);
    }
}

impl From<&Window> for Peak {
    fn from(window: &Window) -> Self {
        Self::new(*window.contig(), *window.interval(), window.combined_qvalue())
    }
}

impl IntervalOp for Peak {
    type Idx = u64;

    fn start(&self) -> Self::Idx {
        self.interval.start()
    }

    fn end(&self) -> Self::Idx {
        self.interval.end()
    }
}
