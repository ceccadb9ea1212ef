use std::fmt::Debug;

/// T values are primitive integers
pub trait PrimInt: ::num::PrimInt + Debug + Default {}
impl<T: ::num::PrimInt + Debug + Default> PrimInt for T {}

/// T values are float numbers
pub trait Float: ::num::Float + Debug + Default {}

impl<T: ::num::Float + Debug + Default> Float for T {}

/// Sample quantile of already sorted values using linear interpolation between the closest ranks
/// (the default method in R and numpy). Returns None for empty input or q outside of [0, 1].
pub fn quantile<F: Float>(sorted: &[F], q: F) -> Option<F> {
    if sorted.is_empty() || q < F::zero() || q > F::one() {
        return None;
    }
    debug_assert!(sorted.windows(2).all(|x| x[0] <= x[1]));

    let last = F::from(sorted.len() - 1)?;
    let rank = q * last;
    let lower = rank.floor();
    let frac = rank - lower;

    let lower = lower.to_usize()?;
    let upper = (lower + 1).min(sorted.len() - 1);
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 0.25), Some(2.0));
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));

        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 0.25), Some(1.75));

        assert_eq!(quantile(&[7.0f64], 0.75), Some(7.0));
        assert_eq!(quantile::<f64>(&[], 0.5), None);
        assert_eq!(quantile(&values, 1.5), None);
    }
}
