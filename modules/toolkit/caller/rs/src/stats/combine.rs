//! Inverse Normal Method: combine per-replicate q-values of a window into a single p-value.

use diffpeak_core_rs::parallelism::ExecutionContext;
use eyre::{Result, WrapErr};
use log::debug;
use statrs::distribution::{ContinuousCDF, Normal};

use super::poisson::PVALUE_EPSILON;
use crate::window::Window;

/// Hartung's correction constant for the estimated correlation.
pub const KAPPA: f64 = 0.2;

/// Reported when the combined statistic underflows the normal CDF.
pub const EXTREME_PVALUE: f64 = 1e-18;

// Fixed block size keeps the correlation estimate independent of the worker count
const CORRELATION_BLOCK: usize = 65_536;

#[derive(Debug, Clone)]
pub struct Combiner {
    replicates: Vec<usize>,
    weights: Vec<f64>,
    rho: Option<f64>,
    normal: Normal,
}

impl Combiner {
    /// `participants` are (replicate index, weight) pairs of replicates taking part in the
    /// combination.
    pub fn new(participants: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let (replicates, weights) = participants.into_iter().unzip();
        let normal = Normal::new(0.0, 1.0).wrap_err("Failed to build the standard normal")?;
        Ok(Self {
            replicates,
            weights,
            rho: None,
            normal,
        })
    }

    pub fn participants(&self) -> usize {
        self.replicates.len()
    }

    /// Estimated correlation, `None` if it was never estimated. Combination then assumes
    /// independent replicates (rho = 0) but keeps the kappa correction.
    pub fn rho(&self) -> Option<f64> {
        self.rho
    }

    /// Inverse normal CDF of a q-value. Infinite values are clamped so that the weighted sum
    /// stays finite; the flag reports the clamp.
    pub fn probit(&self, qvalue: f64) -> (f64, bool) {
        let qvalue = if qvalue.is_nan() { 1.0 } else { qvalue.clamp(0.0, 1.0) };
        let z = self.normal.inverse_cdf(qvalue);
        match z.is_finite() {
            true => (z, false),
            false => {
                let limit = f64::MAX / self.participants().max(1) as f64;
                (limit.copysign(z), true)
            }
        }
    }

    /// Estimate the correlation between replicate probits as one minus the mean within-window
    /// sample variance. Windows with clamped probits are skipped.
    pub fn estimate_correlation(&mut self, ctx: &ExecutionContext, windows: &[Window]) -> Result<f64> {
        let n = self.participants();
        if n < 2 {
            self.rho = Some(0.0);
            return Ok(0.0);
        }

        let blocks = windows.len().div_ceil(CORRELATION_BLOCK);
        let partial = ctx.map(blocks, |block| {
            let start = block * CORRELATION_BLOCK;
            let end = (start + CORRELATION_BLOCK).min(windows.len());

            let (mut variance, mut used) = (0.0, 0u64);
            let mut probits = Vec::with_capacity(n);
            'windows: for window in &windows[start..end] {
                probits.clear();
                for replicate in &self.replicates {
                    let (z, clamped) = self.probit(window.qvalue(*replicate));
                    if clamped {
                        continue 'windows;
                    }
                    probits.push(z);
                }
                let mean = probits.iter().sum::<f64>() / n as f64;
                variance += probits.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                used += 1;
            }
            Ok((variance, used))
        })?;

        let (variance, used) = partial
            .into_iter()
            .fold((0.0, 0), |acc, x| (acc.0 + x.0, acc.1 + x.1));
        let floor = -1.0 / (n - 1) as f64;
        let rho = match used {
            0 => 0.0,
            _ => (1.0 - variance / used as f64).max(floor),
        };
        debug!("Replicate correlation: {rho:.4} estimated over {used} windows");

        self.rho = Some(rho);
        Ok(rho)
    }

    pub fn combine(&self, window: &Window) -> f64 {
        match self.replicates.as_slice() {
            [] => return 1.0,
            [single] => return window.qvalue(*single),
            _ => {}
        }

        let mut numerator = 0.0;
        for (replicate, weight) in self.replicates.iter().zip(&self.weights) {
            numerator += weight * self.probit(window.qvalue(*replicate)).0;
        }
        let statistic = numerator / self.denominator();

        let pvalue = self.normal.cdf(statistic);
        if pvalue.is_nan() {
            PVALUE_EPSILON
        } else if pvalue <= 0.0 {
            EXTREME_PVALUE
        } else {
            pvalue
        }
    }

    fn denominator(&self) -> f64 {
        let sum: f64 = self.weights.iter().sum();
        let squares: f64 = self.weights.iter().map(|w| w * w).sum();
        let rho = self.rho.unwrap_or(0.0);
        let n = self.participants() as f64;
        let corrected = rho + KAPPA * (2.0 / (n + 1.0)).sqrt() * (1.0 - rho);
        (squares + (sum * sum - squares) * corrected).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffpeak_core_rs::loc::Interval;

    fn window(qvalues: &[f64]) -> Window {
        let mut window = Window::new(0, Interval::new(0, 200).unwrap(), qvalues.len());
        for (ind, q) in qvalues.iter().enumerate() {
            window.set_qvalue(ind, *q);
        }
        window
    }

    #[test]
    fn test_single_participant_is_exact() -> Result<()> {
        let combiner = Combiner::new([(1, 0.7)])?;
        let w = window(&[1e-3, 0.123456789]);
        assert_eq!(combiner.combine(&w), 0.123456789);

        let nobody = Combiner::new([])?;
        assert_eq!(nobody.combine(&w), 1.0);
        Ok(())
    }

    #[test]
    fn test_uncorrelated() -> Result<()> {
        let combiner = Combiner::new([(0, 1.0), (1, 1.0)])?;
        assert_eq!(combiner.rho(), None);

        // rho = 0 still pays the kappa term: sqrt(2 + 2 * 0.2 * sqrt(2 / 3))
        let denominator = (2.0 + 2.0 * KAPPA * (2.0f64 / 3.0).sqrt()).sqrt();
        assert!((combiner.denominator() - denominator).abs() < 1e-12);
        assert!((denominator - 1.5228).abs() < 1e-4);

        let w = window(&[0.05, 0.05]);
        let z = combiner.probit(0.05).0;
        let expected = combiner.normal.cdf(2.0 * z / denominator);
        assert!((combiner.combine(&w) - expected).abs() < 1e-12);
        assert!(combiner.combine(&w) < 0.05);
        // Less significant than the plain Stouffer sum
        assert!(combiner.combine(&w) > combiner.normal.cdf(z * 2f64.sqrt()));

        // Estimated zero correlation is the same as no estimate
        let mut estimated = combiner.clone();
        estimated.rho = Some(0.0);
        assert_eq!(estimated.combine(&w), combiner.combine(&w));

        // Opposite evidence cancels out
        let w = window(&[0.1, 0.9]);
        assert!((combiner.combine(&w) - 0.5).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_correlation() -> Result<()> {
        let ctx = ExecutionContext::new(1)?;
        let mut combiner = Combiner::new([(0, 1.0), (1, 1.0)])?;

        // Perfectly correlated probits: zero variance, rho = 1, no gain from replication
        let windows = [window(&[0.01, 0.01]), window(&[0.3, 0.3]), window(&[0.0, 0.0])];
        assert_eq!(combiner.estimate_correlation(&ctx, &windows)?, 1.0);
        assert!((combiner.combine(&windows[0]) - 0.01).abs() < 1e-9);

        // Strongly discordant probits are floored at -1 / (n - 1)
        let windows = [window(&[1e-10, 1.0 - 1e-10])];
        assert_eq!(combiner.estimate_correlation(&ctx, &windows)?, -1.0);
        Ok(())
    }

    #[test]
    fn test_degenerate_values() -> Result<()> {
        let combiner = Combiner::new([(0, 1.0), (1, 1.0)])?;
        let (z, clamped) = combiner.probit(0.0);
        assert!(clamped && z == -f64::MAX / 2.0);

        // Clamped probits sum to -MAX, the CDF underflows to 0
        assert_eq!(combiner.combine(&window(&[0.0, 0.0])), EXTREME_PVALUE);
        // -MAX/2 + MAX/2 == 0 -> p = 0.5
        assert!((combiner.combine(&window(&[0.0, 1.0])) - 0.5).abs() < 1e-12);
        assert!(combiner.combine(&window(&[f64::NAN, f64::NAN])) > 0.99);
        Ok(())
    }
}
