use bitcode::{Decode, Encode};
use derive_getters::{Dissolve, Getters};
use diffpeak_core_rs::loc::{Interval, IntervalOp};

/// Genomic window with per-dataset tag counts and per-replicate significance.
///
/// `counts` holds one slot per dataset (2 per replicate), `pvalues` and `qvalues` hold one slot
/// per replicate plus the combined value in the last slot. Vector lengths never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters, Dissolve)]
pub struct Window {
    contig: usize,
    interval: Interval<u64>,
    counts: Vec<u32>,
    pvalues: Vec<f64>,
    qvalues: Vec<f64>,
}

impl Window {
    pub fn new(contig: usize, interval: Interval<u64>, replicates: usize) -> Self {
        Self {
            contig,
            interval,
            counts: vec![0; 2 * replicates],
            pvalues: vec![1.0; replicates + 1],
            qvalues: vec![1.0; replicates + 1],
        }
    }

    pub fn replicates(&self) -> usize {
        self.pvalues.len() - 1
    }

    /// Sum of tag counts over all datasets.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|x| *x as u64).sum()
    }

    pub fn count(&self, tag: usize) -> u32 {
        self.counts[tag]
    }

    pub fn pvalue(&self, replicate: usize) -> f64 {
        self.pvalues[replicate]
    }

    pub fn qvalue(&self, replicate: usize) -> f64 {
        self.qvalues[replicate]
    }

    /// Combined p-value before the final correction.
    pub fn combined_pvalue(&self) -> f64 {
        self.pvalues[self.replicates()]
    }

    /// Combined p-value after the final correction, used for peak calling.
    pub fn combined_qvalue(&self) -> f64 {
        self.qvalues[self.replicates()]
    }

    pub(crate) fn set_count(&mut self, tag: usize, count: u32) {
        self.counts[tag] = count;
    }

    /// Copy every non-zero tag slot of `other`. Slots are disjoint between construction units.
    pub(crate) fn union(&mut self, other: &Window) {
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            if *theirs != 0 {
                *mine = *theirs;
            }
        }
    }

    pub(crate) fn set_pvalue(&mut self, replicate: usize, pvalue: f64) {
        self.pvalues[replicate] = pvalue;
    }

    pub(crate) fn set_qvalue(&mut self, replicate: usize, qvalue: f64) {
        self.qvalues[replicate] = qvalue;
    }

    pub(crate) fn set_combined(&mut self, pvalue: f64) {
        let ind = self.replicates();
        self.pvalues[ind] = pvalue;
    }

    pub(crate) fn set_combined_qvalue(&mut self, qvalue: f64) {
        let ind = self.replicates();
        self.qvalues[ind] = qvalue;
    }
}

impl IntervalOp for Window {
    type Idx = u64;

    fn start(&self) -> Self::Idx {
        self.interval.start()
    }

    fn end(&self) -> Self::Idx {
        self.interval.end()
    }
}
