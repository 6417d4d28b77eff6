use crate::alignment::SeriesAlignment;
use crate::metric::{FallbackReason, Metric};
use crate::returns::{ReturnSeries, mean};

/// Sample covariance and Pearson correlation of two return series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceResult {
    pub covariance: Metric,
    pub correlation: Metric,
    /// Number of paired observations that entered the computation.
    pub observations: usize,
}

/// Sample variance with the `n - 1` denominator.
///
/// Fewer than two observations yield `Fallback(InsufficientSamples, 0.0)`.
pub fn sample_variance(values: &[f64]) -> Metric {
    let n = values.len();
    if n < 2 {
        return Metric::fallback(FallbackReason::InsufficientSamples, 0.0);
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Metric::Computed(sum_sq / (n - 1) as f64)
}

/// Sample covariance and correlation of two slices, truncated to the shorter length.
pub fn sample_covariance_and_correlation(a: &[f64], b: &[f64]) -> CovarianceResult {
    let n = a.len().min(b.len());
    if n < 2 {
        return CovarianceResult {
            covariance: Metric::fallback(FallbackReason::InsufficientSamples, 0.0),
            correlation: Metric::fallback(FallbackReason::InsufficientSamples, 0.0),
            observations: n,
        };
    }
    let (a, b) = (&a[..n], &b[..n]);

    let mean_a = mean(a);
    let mean_b = mean(b);
    let denominator = (n - 1) as f64;

    let covariance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / denominator;
    let variance_a = a.iter().map(|x| (x - mean_a).powi(2)).sum::<f64>() / denominator;
    let variance_b = b.iter().map(|y| (y - mean_b).powi(2)).sum::<f64>() / denominator;

    let correlation = if variance_a == 0.0 || variance_b == 0.0 {
        Metric::fallback(FallbackReason::ZeroVariance, 0.0)
    } else {
        Metric::Computed(covariance / (variance_a * variance_b).sqrt())
    };

    CovarianceResult {
        covariance: Metric::Computed(covariance),
        correlation,
        observations: n,
    }
}

/// Pairwise dispersion statistics over aligned return series.
#[derive(Debug, Clone, Copy)]
pub struct CovarianceEngine<'a> {
    alignment: &'a dyn SeriesAlignment,
}

impl<'a> CovarianceEngine<'a> {
    pub fn new(alignment: &'a dyn SeriesAlignment) -> Self {
        Self { alignment }
    }

    /// Aligns the two series, then computes their sample covariance and correlation.
    pub fn covariance_and_correlation(
        &self,
        returns_a: &ReturnSeries,
        returns_b: &ReturnSeries,
    ) -> CovarianceResult {
        let pair = self.alignment.align_pair(returns_a, returns_b);
        sample_covariance_and_correlation(&pair.left, &pair.right)
    }

    /// Sample variance of one series; 0 for empty input.
    pub fn variance(&self, returns: &ReturnSeries) -> Metric {
        sample_variance(returns.values())
    }
}
