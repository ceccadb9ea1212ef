use std::sync::atomic::{AtomicU64, Ordering};

use bitcode::{Decode, Encode};

/// Number of log10 bins: [1e-1, 1], [1e-2, 1e-1), ..., [0, 1e-18).
pub const BINS: usize = 19;

/// Distribution of p-values over power-of-ten bins.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PValueHistogram {
    bins: Vec<u64>,
}

impl Default for PValueHistogram {
    fn default() -> Self {
        Self {
            bins: vec![0; BINS],
        }
    }
}

impl PValueHistogram {
    /// Bin index is the negated decimal exponent of the p-value.
    pub fn bin(pvalue: f64) -> usize {
        if pvalue.is_nan() || pvalue <= 0.0 {
            return BINS - 1;
        }
        (-pvalue.log10()).floor().clamp(0.0, (BINS - 1) as f64) as usize
    }

    /// Half-open p-value range covered by the bin.
    pub fn bounds(bin: usize) -> (f64, f64) {
        let upper = 10f64.powi(-(bin as i32));
        match bin + 1 >= BINS {
            true => (0.0, upper),
            false => (upper / 10.0, upper),
        }
    }

    pub fn add(&mut self, pvalue: f64) {
        self.bins[Self::bin(pvalue)] += 1;
    }

    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }
}

impl FromIterator<f64> for PValueHistogram {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut histogram = Self::default();
        for pvalue in iter {
            histogram.add(pvalue);
        }
        histogram
    }
}

/// Histogram shared between worker threads.
pub struct AtomicHistogram {
    bins: Vec<AtomicU64>,
}

impl Default for AtomicHistogram {
    fn default() -> Self {
        Self {
            bins: (0..BINS).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

impl AtomicHistogram {
    pub fn merge(&self, local: &PValueHistogram) {
        for (bin, count) in self.bins.iter().zip(local.bins()) {
            if *count > 0 {
                bin.fetch_add(*count, Ordering::Relaxed);
            }
        }
    }

    pub fn into_inner(self) -> PValueHistogram {
        PValueHistogram {
            bins: self.bins.into_iter().map(|x| x.into_inner()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning() {
        assert_eq!(PValueHistogram::bin(1.0), 0);
        assert_eq!(PValueHistogram::bin(0.5), 0);
        assert_eq!(PValueHistogram::bin(0.05), 1);
        assert_eq!(PValueHistogram::bin(5e-18), 17);
        assert_eq!(PValueHistogram::bin(5e-19), 18);
        assert_eq!(PValueHistogram::bin(1e-300), 18);
        assert_eq!(PValueHistogram::bin(0.0), 18);
        assert_eq!(PValueHistogram::bounds(0), (0.1, 1.0));
        assert_eq!(PValueHistogram::bounds(18).0, 0.0);
    }

    #[test]
    fn test_atomic_merge() {
        let shared = AtomicHistogram::default();
        shared.merge(&[0.5, 0.005].into_iter().collect());
        shared.merge(&[0.3].into_iter().collect());

        let histogram = shared.into_inner();
        assert_eq!(histogram.bins()[0], 2);
        assert_eq!(histogram.bins()[2], 1);
        assert_eq!(histogram.total(), 3);
    }
}
