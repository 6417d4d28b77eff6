use serde::Serialize;
use std::fmt;

/// Why a statistic was substituted instead of computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer than two observations were available.
    InsufficientSamples,
    /// One of the series has zero variance, so correlation is undefined.
    ZeroVariance,
    /// The market series has zero variance, so beta is undefined.
    ZeroMarketVariance,
    /// The mean return is exactly zero; 1.0 is used as the divisor.
    ZeroMean,
    /// The holdings are worth nothing, so value weights are undefined.
    ZeroTotalValue,
    /// No instrument contributed a positive weight to the market series.
    ZeroWeightSum,
    /// The regression window has a single point.
    ZeroDenominator,
    /// The regression produced NaN or an infinity.
    NonFiniteSlope,
    /// The regression window is flat.
    FlatTrend,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::InsufficientSamples => "fewer than two samples",
            FallbackReason::ZeroVariance => "zero variance",
            FallbackReason::ZeroMarketVariance => "zero market variance",
            FallbackReason::ZeroMean => "zero mean return",
            FallbackReason::ZeroTotalValue => "zero total value",
            FallbackReason::ZeroWeightSum => "zero weight sum",
            FallbackReason::ZeroDenominator => "zero regression denominator",
            FallbackReason::NonFiniteSlope => "non-finite slope",
            FallbackReason::FlatTrend => "flat trend",
        };
        f.write_str(text)
    }
}

/// A statistic together with the branch that produced it.
///
/// Degenerate inputs never raise errors inside the engine; they take a named fallback
/// branch instead, and the tag records which one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Computed(f64),
    Fallback { reason: FallbackReason, value: f64 },
}

impl Metric {
    pub fn fallback(reason: FallbackReason, value: f64) -> Self {
        tracing::debug!(%reason, value, "Fallback value substituted.");
        Metric::Fallback { reason, value }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Metric::Computed(value) => value,
            Metric::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Metric::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match *self {
            Metric::Computed(_) => None,
            Metric::Fallback { reason, .. } => Some(reason),
        }
    }

    /// Transforms the value while keeping the branch tag.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Metric::Computed(value) => Metric::Computed(f(value)),
            Metric::Fallback { reason, value } => Metric::Fallback {
                reason,
                value: f(value),
            },
        }
    }
}

/// Rounds half away from zero to `places` decimals, matching how figures leave the engine.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
