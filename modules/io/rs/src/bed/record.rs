#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::{Dissolve, Getters};
use diffpeak_core_rs::loc::Interval;
use eyre::Result;

use super::validate;

#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Getters, Dissolve)]
pub struct Bed5 {
    seqid: String,
    interval: Interval<u64>,
    name: String,
    score: u16,
}

impl Bed5 {
    pub fn new(seqid: String, interval: Interval<u64>, name: String, score: u16) -> Result<Self> {
        validate::seqid(&seqid)?;
        validate::name(&name)?;
        validate::score(score)?;
        Ok(Self {
            seqid,
            interval,
            name,
            score,
        })
    }

    /// BED score derived from a p-value: -10 * log10(p), capped at 1000.
    pub fn score_from_pvalue(pvalue: f64) -> u16 {
        if pvalue.is_nan() || pvalue <= 0.0 {
            return 1000;
        }
        (-10.0 * pvalue.log10()).round().clamp(0.0, 1000.0) as u16
    }
}
