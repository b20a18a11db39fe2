// NaN-safe aggregation helpers
//
// An undefined statistic (empty input, zero denominator) is `None`. NaN inputs
// are dropped before aggregating, never propagated.

/// Mean of the non-NaN values, `None` if there are none
pub fn nan_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// `numerator / denominator`, `None` when the denominator is zero or NaN
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || denominator.is_nan() {
        None
    } else {
        Some(numerator / denominator)
    }
}
