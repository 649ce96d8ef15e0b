//! The two interval analysis implementations
//!
//! Both model an idealized clock emitting a strictly alternating long/short
//! beat; they differ in how they quantify the asymmetry.

use chrono::Utc;

use super::{BalanceResult, DeviationResult, IntervalAnalysis, MeasurementOutcome};

/// Odd/even interval balance (canonical method)
///
/// An even timestamp count would give one alternating interval group one
/// more sample than the other, so the last timestamp is dropped first.
/// Fewer than 3 remaining timestamps yield the degenerate zero result.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceAnalysis;

impl IntervalAnalysis for BalanceAnalysis {
    fn analyze(&self, timestamps: &[f64]) -> MeasurementOutcome {
        let now_ms = Utc::now().timestamp_millis();

        let effective = if timestamps.len() % 2 == 0 {
            timestamps.len().saturating_sub(1)
        } else {
            timestamps.len()
        };
        let times = &timestamps[..effective];

        // One T1 sample needs ticks 0->1, one T2 sample ticks 1->2
        if times.len() < 3 {
            return MeasurementOutcome::Balance(BalanceResult {
                t1_mean_ms: 0.0,
                t2_mean_ms: 0.0,
                balance_percent: 0.0,
                sample_count: 0,
                timestamp_unix_ms: now_ms,
            });
        }

        let mut t1 = Vec::with_capacity(times.len() / 2);
        let mut t2 = Vec::with_capacity(times.len() / 2);
        let mut i = 0;
        while i + 1 < times.len() {
            t1.push(times[i + 1] - times[i]);
            if i + 2 < times.len() {
                t2.push(times[i + 2] - times[i + 1]);
            }
            i += 2;
        }

        let t1_mean = t1.iter().sum::<f64>() / t1.len() as f64;
        let t2_mean = t2.iter().sum::<f64>() / t2.len() as f64;
        let max_mean = t1_mean.max(t2_mean);
        let balance_percent = if max_mean > 0.0 {
            t1_mean.min(t2_mean) / max_mean * 100.0
        } else {
            0.0
        };

        MeasurementOutcome::Balance(BalanceResult {
            t1_mean_ms: t1_mean * 1000.0,
            t2_mean_ms: t2_mean * 1000.0,
            balance_percent,
            sample_count: t1.len(),
            timestamp_unix_ms: now_ms,
        })
    }
}

/// Tik/tak coefficient-of-variation deviations (historical batch mode)
///
/// Consecutive intervals are assigned alternating tik/tak roles starting
/// with tik. The headline figure is the coefficient of variation of all
/// intervals; the split averages report how far each role drifts from the
/// overall mean, signed. Fewer than 2 intervals yield the degenerate zero
/// result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviationAnalysis;

impl IntervalAnalysis for DeviationAnalysis {
    fn analyze(&self, timestamps: &[f64]) -> MeasurementOutcome {
        let now_ms = Utc::now().timestamp_millis();

        let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = if intervals.is_empty() {
            0.0
        } else {
            intervals.iter().sum::<f64>() / intervals.len() as f64
        };

        if intervals.len() < 2 || mean <= 0.0 {
            return MeasurementOutcome::Deviation(DeviationResult {
                total_deviation_percent: 0.0,
                avg_tik_deviation_percent: 0.0,
                avg_tak_deviation_percent: 0.0,
                interval_count: 0,
                timestamp_unix_ms: now_ms,
            });
        }

        let variance = intervals
            .iter()
            .map(|x| (x - mean) * (x - mean))
            .sum::<f64>()
            / intervals.len() as f64;
        let total_deviation_percent = variance.sqrt() / mean * 100.0;

        let deviations: Vec<f64> = intervals
            .iter()
            .map(|x| (x - mean) / mean * 100.0)
            .collect();
        let (tik, tak): (Vec<_>, Vec<_>) = deviations
            .iter()
            .enumerate()
            .partition(|(i, _)| i % 2 == 0);

        let group_mean = |group: &[(usize, &f64)]| {
            if group.is_empty() {
                0.0
            } else {
                group.iter().map(|(_, d)| **d).sum::<f64>() / group.len() as f64
            }
        };

        MeasurementOutcome::Deviation(DeviationResult {
            total_deviation_percent,
            avg_tik_deviation_percent: group_mean(&tik),
            avg_tak_deviation_percent: group_mean(&tak),
            interval_count: intervals.len(),
            timestamp_unix_ms: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn balance(timestamps: &[f64]) -> BalanceResult {
        match BalanceAnalysis.analyze(timestamps) {
            MeasurementOutcome::Balance(r) => r,
            other => panic!("expected balance result, got {other:?}"),
        }
    }

    fn deviation(timestamps: &[f64]) -> DeviationResult {
        match DeviationAnalysis.analyze(timestamps) {
            MeasurementOutcome::Deviation(r) => r,
            other => panic!("expected deviation result, got {other:?}"),
        }
    }

    #[test]
    fn test_balance_five_ticks() {
        // T1 from pairs (0,1),(2,3); T2 from (1,2),(3,4)
        let result = balance(&[0.000, 0.500, 1.000, 1.480, 2.000]);
        assert_relative_eq!(result.t1_mean_ms, 490.0, epsilon = 1e-9);
        assert_relative_eq!(result.t2_mean_ms, 510.0, epsilon = 1e-9);
        assert_relative_eq!(result.balance_percent, 100.0 * 490.0 / 510.0, epsilon = 1e-9);
        assert_eq!(result.sample_count, 2);
    }

    #[test]
    fn test_balance_even_count_drops_last() {
        let result = balance(&[0.0, 1.0, 2.0, 3.0]);
        assert_relative_eq!(result.t1_mean_ms, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(result.t2_mean_ms, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(result.balance_percent, 100.0, epsilon = 1e-9);
        assert_eq!(result.sample_count, 1);
    }

    #[test]
    fn test_balance_perfectly_even_is_100() {
        let result = balance(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_relative_eq!(result.balance_percent, 100.0, epsilon = 1e-9);
        assert_relative_eq!(result.t1_mean_ms, result.t2_mean_ms, epsilon = 1e-9);
    }

    #[test]
    fn test_balance_bounds() {
        let result = balance(&[0.0, 0.2, 1.0, 1.2, 2.0]);
        assert!(result.balance_percent > 0.0 && result.balance_percent < 100.0);
    }

    #[test]
    fn test_balance_degenerate_inputs() {
        for input in [&[][..], &[1.0][..], &[1.0, 1.5][..], &[1.0, 1.5, 2.0, 2.5][..]] {
            // 4 timestamps drop to 3 -> not degenerate; the rest are
            if input.len() == 4 {
                continue;
            }
            let result = balance(input);
            assert!(result.is_degenerate(), "input {input:?}");
            assert_eq!(result.t1_mean_ms, 0.0);
            assert_eq!(result.t2_mean_ms, 0.0);
            assert_eq!(result.balance_percent, 0.0);
        }
    }

    #[test]
    fn test_balance_two_ticks_degenerate_after_drop() {
        // 2 timestamps drop to 1 -> degenerate
        assert!(balance(&[0.0, 0.5]).is_degenerate());
    }

    #[test]
    fn test_balance_result_has_wall_clock_stamp() {
        let result = balance(&[0.0, 0.5, 1.0]);
        assert!(result.timestamp_unix_ms > 0);
    }

    #[test]
    fn test_deviation_uniform_intervals() {
        let result = deviation(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_relative_eq!(result.total_deviation_percent, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.avg_tik_deviation_percent, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.avg_tak_deviation_percent, 0.0, epsilon = 1e-9);
        assert_eq!(result.interval_count, 4);
    }

    #[test]
    fn test_deviation_alternating_beat() {
        // Intervals 0.6, 0.4, 0.6, 0.4 -> mean 0.5
        // tik (even indices) +20%, tak (odd indices) -20%, CV = 20%
        let result = deviation(&[0.0, 0.6, 1.0, 1.6, 2.0]);
        assert_relative_eq!(result.total_deviation_percent, 20.0, epsilon = 1e-9);
        assert_relative_eq!(result.avg_tik_deviation_percent, 20.0, epsilon = 1e-9);
        assert_relative_eq!(result.avg_tak_deviation_percent, -20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deviation_degenerate_inputs() {
        for input in [&[][..], &[1.0][..], &[1.0, 1.5][..]] {
            let result = deviation(input);
            assert!(result.is_degenerate(), "input {input:?}");
        }
    }

    #[test]
    fn test_strategy_dispatch() {
        use crate::analysis::AnalysisStrategy;

        let times = [0.0, 0.5, 1.0, 1.5, 2.0];
        assert!(matches!(
            AnalysisStrategy::OddEvenBalance.analysis().analyze(&times),
            MeasurementOutcome::Balance(_)
        ));
        assert!(matches!(
            AnalysisStrategy::TikTakDeviation.analysis().analyze(&times),
            MeasurementOutcome::Deviation(_)
        ));
    }
}
