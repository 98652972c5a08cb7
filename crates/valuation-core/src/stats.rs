//! Small descriptive-statistics helpers shared by the engine crates.
//!
//! Empty input yields 0.0, never NaN.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute the median (average of the two middle values for even lengths).
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(data);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Population standard deviation (divides by n).
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Value at `sorted[floor(len * fraction)]`, clamped to the last element.
/// `sorted` must already be in ascending order.
pub fn floor_percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() as f64 * fraction).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Ascending copy; NaN compares equal so it never panics.
pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        // mean 5, squared deviations sum to 32 over 8 values
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std_dev(&data), 2.0, epsilon = 1e-12);
        assert_eq!(population_std_dev(&[7.0]), 0.0);
    }

    #[test]
    fn test_floor_percentile() {
        let sorted: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(floor_percentile(&sorted, 0.1), 1.0);
        assert_eq!(floor_percentile(&sorted, 0.25), 2.0);
        assert_eq!(floor_percentile(&sorted, 0.9), 9.0);
        assert_eq!(floor_percentile(&sorted, 1.0), 9.0);
        assert_eq!(floor_percentile(&[], 0.5), 0.0);
    }
}
