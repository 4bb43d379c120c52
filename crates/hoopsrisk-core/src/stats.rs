// Small numeric helpers shared by the pipeline stages.

/// Threshold below which a divisor is treated as zero.
const ZERO_EPSILON: f64 = 1e-12;

/// Median of the finite values in `values`. `None` when there are none.
///
/// Even-length inputs average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}

/// Median of the present values in a column of optionals.
pub fn median_of(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.into_iter().flatten().collect();
    median(&present)
}

/// Sample standard deviation (N - 1 denominator).
///
/// Returns 0.0 for fewer than two values, where the sample deviation is
/// undefined and the career shows no measurable volatility.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Relative change `(current - previous) / previous`.
///
/// `None` when either side is absent or the previous value is zero.
pub fn pct_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    let (prev, cur) = (previous?, current?);
    if prev.abs() < ZERO_EPSILON {
        return None;
    }
    Some((cur - prev) / prev)
}

/// Clamp `x` to `[lo, hi]`.
pub fn clip(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Replace each gap with the last value seen before it. Leading gaps stay.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

/// 1-based dense rank of each value: equal values share a rank, and ranks
/// have no gaps.
pub fn dense_rank(values: &[i32]) -> Vec<u32> {
    let mut distinct: Vec<i32> = values.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    values
        .iter()
        .map(|v| match distinct.binary_search(v) {
            Ok(pos) => pos as u32 + 1,
            Err(_) => 0,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
