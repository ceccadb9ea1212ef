use bitcode::{Decode, Encode};
use derive_getters::Getters;
use diffpeak_core_rs::num::quantile;

/// Five-number summary of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode, Getters)]
pub struct BoxPlot {
    min: f64,
    lower_quartile: f64,
    median: f64,
    upper_quartile: f64,
    max: f64,
}

impl BoxPlot {
    pub fn from_sorted(values: &[f64]) -> Option<Self> {
        Some(Self {
            min: *values.first()?,
            lower_quartile: quantile(values, 0.25)?,
            median: quantile(values, 0.5)?,
            upper_quartile: quantile(values, 0.75)?,
            max: *values.last()?,
        })
    }

    pub fn from_unsorted(mut values: Vec<f64>) -> Option<Self> {
        values.retain(|x| !x.is_nan());
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Summary of integer observations given as `bins[value] = occurrences`.
    pub fn from_histogram(bins: &[u64]) -> Option<Self> {
        let total: u64 = bins.iter().sum();
        if total == 0 {
            return None;
        }

        // k-th (0-based) order statistic of the expanded sample
        let nth = |k: u64| -> f64 {
            let mut seen = 0;
            for (value, count) in bins.iter().enumerate() {
                seen += count;
                if seen > k {
                    return value as f64;
                }
            }
            (bins.len() - 1) as f64
        };
        let quantile = |q: f64| -> f64 {
            let rank = q * (total - 1) as f64;
            let lower = rank.floor() as u64;
            let upper = (lower + 1).min(total - 1);
            let (lo, hi) = (nth(lower), nth(upper));
            lo + (hi - lo) * (rank - lower as f64)
        };

        Some(Self {
            min: nth(0),
            lower_quartile: quantile(0.25),
            median: quantile(0.5),
            upper_quartile: quantile(0.75),
            max: nth(total - 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_matches_sorted() {
        let mut bins = vec![0; 50];
        let values = [3.0, 7.0, 7.0, 10.0, 12.0, 40.0];
        for v in values {
            bins[v as usize] += 1;
        }
        assert_eq!(
            BoxPlot::from_histogram(&bins),
            BoxPlot::from_sorted(&values)
        );
        assert_eq!(BoxPlot::from_histogram(&[0, 0, 0]), None);
    }

    #[test]
    fn test_summary() {
        let plot = BoxPlot::from_unsorted(vec![5.0, 1.0, f64::NAN, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(
            (plot.min, plot.lower_quartile, plot.median, plot.upper_quartile, plot.max),
            (1.0, 2.0, 3.0, 4.0, 5.0)
        );
        assert_eq!(BoxPlot::from_unsorted(vec![]), None);
    }
}
