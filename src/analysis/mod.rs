//! Interval analysis of captured tick timestamps
//!
//! Two historical framings of beat regularity exist: the odd/even
//! interval-balance method (canonical) and the tik/tak
//! coefficient-of-variation method. Both are kept behind the
//! [`IntervalAnalysis`] seam and selected by [`AnalysisStrategy`] in the
//! engine configuration; the session controller never hard-wires one.

pub mod interval;

pub use interval::{BalanceAnalysis, DeviationAnalysis};

use serde::{Deserialize, Serialize};

/// Which interval analysis runs at measurement completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    /// Odd/even interval balance (canonical)
    OddEvenBalance,
    /// Tik/tak coefficient-of-variation deviations (historical batch mode)
    TikTakDeviation,
}

impl AnalysisStrategy {
    /// The analysis implementation for this strategy
    pub fn analysis(self) -> &'static dyn IntervalAnalysis {
        match self {
            Self::OddEvenBalance => &BalanceAnalysis,
            Self::TikTakDeviation => &DeviationAnalysis,
        }
    }
}

/// Reduces one measurement session's tick timestamps to a result
///
/// Implementations never fail: too little data yields a degenerate
/// zero result, which is itself the "too few ticks" signal to the caller.
pub trait IntervalAnalysis {
    /// Analyze an ordered, strictly increasing timestamp sequence (seconds)
    fn analyze(&self, timestamps: &[f64]) -> MeasurementOutcome;
}

/// Result of the odd/even balance method
///
/// T1 collects the intervals between pairs `(0,1), (2,3), ...` and T2 the
/// intervals between `(1,2), (3,4), ...`; balance is the ratio of the
/// smaller to the larger group mean, as a percentage. 100 means a
/// perfectly even beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    /// Mean of the T1 interval group in milliseconds
    pub t1_mean_ms: f64,
    /// Mean of the T2 interval group in milliseconds
    pub t2_mean_ms: f64,
    /// 100 * min(t1, t2) / max(t1, t2); 0 when either mean is 0
    pub balance_percent: f64,
    /// Number of T1 samples
    pub sample_count: usize,
    /// Wall-clock capture time, Unix milliseconds
    pub timestamp_unix_ms: i64,
}

impl BalanceResult {
    /// True when too few ticks were captured to analyze
    pub fn is_degenerate(&self) -> bool {
        self.sample_count == 0
    }
}

/// Result of the tik/tak coefficient-of-variation method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationResult {
    /// Coefficient of variation of all intervals, percent
    pub total_deviation_percent: f64,
    /// Mean deviation of tik (even-indexed) intervals from the mean, percent
    pub avg_tik_deviation_percent: f64,
    /// Mean deviation of tak (odd-indexed) intervals from the mean, percent
    pub avg_tak_deviation_percent: f64,
    /// Number of intervals analyzed
    pub interval_count: usize,
    /// Wall-clock capture time, Unix milliseconds
    pub timestamp_unix_ms: i64,
}

impl DeviationResult {
    /// True when too few ticks were captured to analyze
    pub fn is_degenerate(&self) -> bool {
        self.interval_count == 0
    }
}

/// Terminal result of a measurement session, tagged by strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementOutcome {
    /// Odd/even balance result
    Balance(BalanceResult),
    /// Tik/tak deviation result
    Deviation(DeviationResult),
}

impl MeasurementOutcome {
    /// True when the underlying result is the degenerate zero result
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Balance(r) => r.is_degenerate(),
            Self::Deviation(r) => r.is_degenerate(),
        }
    }
}
