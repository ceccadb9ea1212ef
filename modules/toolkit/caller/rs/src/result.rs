use derive_getters::{Dissolve, Getters};

use crate::peaks::{Peak, PeakQuality};
use crate::replicate::Replicate;
use crate::stats::Summary;

/// Output of a finished calculation.
#[derive(Debug, Clone, PartialEq, Getters, Dissolve)]
pub struct CallResult {
    contigs: Vec<String>,
    narrow: Vec<Peak>,
    broad: Vec<Peak>,
    replicates: Vec<Replicate>,
    /// Empty unless quality counting is enabled.
    quality: Vec<PeakQuality>,
    summary: Summary,
}

impl CallResult {
    pub fn new(
        contigs: Vec<String>,
        narrow: Vec<Peak>,
        broad: Vec<Peak>,
        replicates: Vec<Replicate>,
        quality: Vec<PeakQuality>,
        summary: Summary,
    ) -> Self {
        Self {
            contigs,
            narrow,
            broad,
            replicates,
            quality,
            summary,
        }
    }
}
