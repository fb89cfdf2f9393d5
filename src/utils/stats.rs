//! Descriptive statistics over similarity and area values
//!
//! All helpers accept an empty input and return `None` (or zero for shares)
//! instead of NaN, so aggregations over an empty selection stay well-formed.

/// Median by selection (average of the two middle values for even lengths).
///
/// Reorders `values` in place. NaNs must be filtered out by the caller.
pub fn median(values: &mut [f32]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper as f64;

    if n % 2 == 1 {
        return Some(upper);
    }

    // Largest value of the lower half is the other middle element
    let lower_max = lower
        .iter()
        .copied()
        .max_by(f32::total_cmp)
        .map(f64::from)
        .unwrap_or(upper);

    Some((lower_max + upper) / 2.0)
}

/// Arithmetic mean in f64
pub fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some(sum / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator), `None` below two values
pub fn sample_std_dev(values: &[f32]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Share of `part` in `total` as a percentage (0-100), zero when `total` is zero
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        let mut odd = vec![0.9, 0.1, 0.5];
        assert_relative_eq!(median(&mut odd).unwrap(), 0.5, epsilon = 1e-6);

        let mut even = vec![0.4, 0.1, 0.9, 0.2];
        assert_relative_eq!(median(&mut even).unwrap(), 0.3, epsilon = 1e-6);

        let mut single = vec![0.85];
        assert_relative_eq!(median(&mut single).unwrap(), 0.85, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(median(&mut []), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[0.5]), None);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn test_sample_std_dev() {
        // Sample variance of [2, 4, 4, 4, 5, 5, 7, 9] is 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(sample_std_dev(&values).unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-9);
        assert_relative_eq!(mean(&values).unwrap(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_percentage() {
        assert_relative_eq!(percentage(1, 4), 25.0);
        assert_relative_eq!(percentage(4, 4), 100.0);
    }
}
