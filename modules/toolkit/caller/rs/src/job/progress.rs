use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Fraction of the current job completed, in [0, 1]. Never decreases within a run.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU64>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn advance(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (fraction > f64::from_bits(bits)).then(|| fraction.to_bits())
            });
    }

    pub(crate) fn reset(&self) {
        self.0.store(0f64.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotone() {
        let progress = Progress::new();
        assert_eq!(progress.get(), 0.0);

        progress.advance(0.25);
        progress.advance(0.1);
        assert_eq!(progress.get(), 0.25);
        progress.advance(7.0);
        assert_eq!(progress.get(), 1.0);

        progress.reset();
        assert_eq!(progress.get(), 0.0);
    }
}
