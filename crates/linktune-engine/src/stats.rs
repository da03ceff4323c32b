//! Summary statistics over observation windows.

/// Median of `values`; the mean of the two middle values for even lengths.
/// Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Least-squares slope of `values` against their index (0, 1, 2, ...).
///
/// Positive means rising, negative falling. Zero for fewer than two points.
pub fn trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let (numerator, denominator) = values.iter().enumerate().fold(
        (0.0, 0.0),
        |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        },
    );

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}
