//! Utilities for numerics.

/// Computes the arithmetic mean and the population standard deviation of `values`.
///
/// The standard deviation divides by `n`, not `n - 1` (no Bessel correction).
///
/// Returns [`None`] if `values` is empty.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn population_std() {
        let (mean, std) = mean_std(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(mean, 2.0);
        assert_relative_eq!(std, 0.816496580927726, max_relative = 1e-12);
    }

    #[test]
    fn single_value_has_zero_std() {
        assert_eq!(mean_std(&[-4.5]), Some((-4.5, 0.0)));
    }

    #[test]
    fn empty() {
        assert_eq!(mean_std(&[]), None);
    }
}
