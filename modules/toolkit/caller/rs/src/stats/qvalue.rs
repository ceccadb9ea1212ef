//! Multiple-testing corrections. All methods return adjusted values in the input order, capped
//! at 1 and monotone in the raw p-values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::QValueMethod;

/// Tuning grid of the bootstrap estimate: 0.00, 0.05, ..., 0.95.
const BOOTSTRAP_LAMBDAS: usize = 20;
const BOOTSTRAP_RESAMPLES: usize = 100;
const BOOTSTRAP_MAX_SAMPLE: usize = 100_000;
const STOREY_LAMBDA: f64 = 0.5;

pub fn correct(method: QValueMethod, pvalues: &[f64], seed: u64) -> Vec<f64> {
    if pvalues.is_empty() {
        return Vec::new();
    }
    let pvalues = pvalues
        .iter()
        .map(|p| if p.is_nan() { 1.0 } else { p.clamp(0.0, 1.0) })
        .collect::<Vec<_>>();

    match method {
        QValueMethod::Holm => holm(&pvalues),
        QValueMethod::StoreySimple => storey(&pvalues, pi0(&pvalues, STOREY_LAMBDA)),
        QValueMethod::StoreyBootstrap => storey(&pvalues, bootstrap_pi0(&pvalues, seed)),
    }
}

fn ascending(pvalues: &[f64]) -> Vec<usize> {
    let mut order = (0..pvalues.len()).collect::<Vec<_>>();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));
    order
}

/// Holm step-down adjustment.
fn holm(pvalues: &[f64]) -> Vec<f64> {
    let total = pvalues.len();
    let mut adjusted = vec![1.0; total];
    let mut running: f64 = 0.0;
    for (rank, ind) in ascending(pvalues).into_iter().enumerate() {
        let value = ((total - rank) as f64 * pvalues[ind]).min(1.0);
        running = running.max(value);
        adjusted[ind] = running;
    }
    adjusted
}

/// Estimated fraction of true null hypotheses for the given tuning parameter.
fn pi0(pvalues: &[f64], lambda: f64) -> f64 {
    let above = pvalues.iter().filter(|p| **p > lambda).count();
    let total = pvalues.len() as f64;
    (above as f64 / (total * (1.0 - lambda))).clamp(1.0 / total, 1.0)
}

/// Pick the tuning parameter minimizing the bootstrap mean squared error of the π0 estimate.
fn bootstrap_pi0(pvalues: &[f64], seed: u64) -> f64 {
    let lambdas = (0..BOOTSTRAP_LAMBDAS)
        .map(|x| x as f64 * 0.05)
        .collect::<Vec<_>>();
    let estimates = lambdas
        .iter()
        .map(|l| pi0(pvalues, *l))
        .collect::<Vec<_>>();
    let reference = estimates.iter().copied().fold(f64::INFINITY, f64::min);

    let mut rng = StdRng::seed_from_u64(seed);
    let size = pvalues.len().min(BOOTSTRAP_MAX_SAMPLE);
    let mut sample = Vec::with_capacity(size);
    let mut mse = vec![0.0; lambdas.len()];
    for _ in 0..BOOTSTRAP_RESAMPLES {
        sample.clear();
        sample.extend((0..size).map(|_| pvalues[rng.random_range(0..pvalues.len())]));
        for (err, lambda) in mse.iter_mut().zip(&lambdas) {
            *err += (pi0(&sample, *lambda) - reference).powi(2);
        }
    }

    let best = mse
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(ind, _)| ind)
        .unwrap_or(0);
    estimates[best]
}

/// Storey q-values for a fixed π0.
fn storey(pvalues: &[f64], pi0: f64) -> Vec<f64> {
    let total = pvalues.len() as f64;
    let mut adjusted = vec![1.0; pvalues.len()];
    let mut running: f64 = 1.0;
    for (rank, ind) in ascending(pvalues).into_iter().enumerate().rev() {
        let value = pi0 * total * pvalues[ind] / (rank + 1) as f64;
        running = running.min(value);
        adjusted[ind] = running;
    }
    adjusted
}
