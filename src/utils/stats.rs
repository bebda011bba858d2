use log::trace;
use statrs::statistics::Statistics;

/// Arithmetic mean that does not depend on the order of `values`.
///
/// Values are summed in ascending order so that permuted inputs give
/// bit-identical results. Returns `0.0` for an empty slice.
pub fn order_independent_mean(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    values.iter().sum::<f64>() / values.len() as f64
}

/// Welch statistic `|mean1 - mean2| / sqrt(var1/n1 + var2/n2)` with sample
/// variances. `None` when either sample has fewer than two values.
pub fn welch_statistic(
    sample1: &[f64],
    sample2: &[f64],
) -> Option<f64> {
    if sample1.len() < 2 || sample2.len() < 2 {
        return None;
    }
    let (n1, n2) = (sample1.len() as f64, sample2.len() as f64);
    let diff = (sample1.mean() - sample2.mean()).abs();
    let se = (sample1.variance() / n1 + sample2.variance() / n2).sqrt();

    if se == 0.0 || !se.is_finite() {
        // Constant samples: identical means carry no evidence, differing
        // ones are perfectly separated.
        return Some(if diff == 0.0 { 0.0 } else { f64::INFINITY });
    }
    Some(diff / se)
}

/// Approximate two-sample p-value `1 / (1 + t * sqrt(df / 2))` with
/// `df = n1 + n2 - 2`.
///
/// This is a monotone stand-in for the t-distribution tail, kept for
/// compatibility of reported values. Returns `1.0` when either sample has
/// fewer than two values.
pub fn approx_welch_pvalue(
    sample1: &[f64],
    sample2: &[f64],
) -> f64 {
    let Some(t) = welch_statistic(sample1, sample2) else {
        return 1.0;
    };
    let df = (sample1.len() + sample2.len() - 2) as f64;
    let p = 1.0 / (1.0 + t * (df / 2.0).sqrt());
    trace!(
        "Welch comparison n1={} n2={} t={} p={}",
        sample1.len(),
        sample2.len(),
        t,
        p
    );
    if p.is_nan() {
        1.0
    }
    else {
        p
    }
}
