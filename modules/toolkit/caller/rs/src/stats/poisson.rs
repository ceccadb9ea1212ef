use eyre::{Result, WrapErr};
use statrs::distribution::{Discrete, DiscreteCDF, Poisson};

/// Smallest reported p-value. A CDF saturated at 1.0 would otherwise produce p = 0.
pub const PVALUE_EPSILON: f64 = 1e-17;

// Poisson is undefined for zero mean, empty datasets get a vanishing one instead
const MIN_LAMBDA: f64 = 1e-9;

/// Poisson background model of per-window tag counts.
#[derive(Debug, Clone, Copy)]
pub struct PoissonModel {
    lambda: f64,
    distribution: Poisson,
}

impl PoissonModel {
    pub fn new(lambda: f64) -> Result<Self> {
        let lambda = if lambda.is_finite() { lambda.max(MIN_LAMBDA) } else { lambda };
        let distribution =
            Poisson::new(lambda).wrap_err_with(|| format!("Invalid Poisson mean {lambda}"))?;
        Ok(Self {
            lambda,
            distribution,
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn pmf(&self, count: u64) -> f64 {
        self.distribution.pmf(count)
    }

    /// Probability of observing more than `count` tags. Fractional (scaled) counts are rounded.
    pub fn pvalue(&self, count: f64) -> f64 {
        let count = count.round().max(0.0) as u64;
        let pvalue = 1.0 - self.distribution.cdf(count);
        match pvalue > 0.0 {
            true => pvalue,
            false => PVALUE_EPSILON,
        }
    }

    /// Root of the summed squared differences between a normalized histogram and the model PMF,
    /// scaled by the number of bins.
    pub fn least_squares_distance(&self, histogram: &[f64]) -> f64 {
        if histogram.is_empty() {
            return 0.0;
        }
        let sum: f64 = histogram
            .iter()
            .enumerate()
            .map(|(count, freq)| (freq - self.pmf(count as u64)).powi(2))
            .sum();
        sum.sqrt() / histogram.len() as f64
    }
}
