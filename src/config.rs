//! Engine configuration: sensitivity threshold, frequency presets, and
//! analysis strategy selection.
//!
//! Configuration is freely mutable at any time, including mid-session; the
//! next processed frame observes the new values. Invalid inputs are clamped,
//! never rejected.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisStrategy;

/// Default detection threshold as a fraction of full scale (30%)
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// A frequency band in Hz used to band-limit the frequency-domain level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    /// Lower band edge in Hz
    pub min_hz: f32,
    /// Upper band edge in Hz
    pub max_hz: f32,
}

impl FrequencyRange {
    /// Create a range, swapping the edges if they are given out of order
    pub fn new(min_hz: f32, max_hz: f32) -> Self {
        if min_hz <= max_hz {
            Self { min_hz, max_hz }
        } else {
            Self {
                min_hz: max_hz,
                max_hz: min_hz,
            }
        }
    }
}

/// Frequency band presets for different clock sizes
///
/// Smaller clocks tick higher; larger clocks (longcase, wall regulators)
/// tick lower. `Custom` uses the caller-supplied range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyPreset {
    /// Small clock, 1-4 kHz
    Small,
    /// Medium clock, 0.8-3 kHz
    Medium,
    /// Large clock, 0.5-2 kHz
    Large,
    /// Caller-defined range
    Custom,
}

impl FrequencyPreset {
    /// Resolve the preset to a concrete band, using `custom` for [`Self::Custom`]
    pub fn range(&self, custom: FrequencyRange) -> FrequencyRange {
        match self {
            Self::Small => FrequencyRange {
                min_hz: 1000.0,
                max_hz: 4000.0,
            },
            Self::Medium => FrequencyRange {
                min_hz: 800.0,
                max_hz: 3000.0,
            },
            Self::Large => FrequencyRange {
                min_hz: 500.0,
                max_hz: 2000.0,
            },
            Self::Custom => custom,
        }
    }
}

/// Mutable engine configuration, owned by a [`crate::TickEngine`] instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Detection threshold as a fraction of full scale, 0.0..=1.0
    pub threshold: f32,
    /// Active frequency preset
    pub preset: FrequencyPreset,
    /// Band used when `preset` is [`FrequencyPreset::Custom`]
    pub custom_range: FrequencyRange,
    /// Interval analysis strategy applied at measurement completion
    pub strategy: AnalysisStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            preset: FrequencyPreset::Medium,
            custom_range: FrequencyRange {
                min_hz: 800.0,
                max_hz: 3000.0,
            },
            strategy: AnalysisStrategy::OddEvenBalance,
        }
    }
}

impl EngineConfig {
    /// Set the threshold from a percentage, clamped to 0..=100
    pub fn set_threshold_percent(&mut self, percent: u8) {
        self.threshold = f32::from(percent.min(100)) / 100.0;
    }

    /// Switch to a named preset
    pub fn set_frequency_preset(&mut self, preset: FrequencyPreset) {
        self.preset = preset;
    }

    /// Set a custom band and switch the preset to `Custom`
    pub fn set_custom_range(&mut self, min_hz: f32, max_hz: f32) {
        self.custom_range = FrequencyRange::new(min_hz, max_hz);
        self.preset = FrequencyPreset::Custom;
    }

    /// The band currently in effect
    pub fn active_range(&self) -> FrequencyRange {
        self.preset.range(self.custom_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.preset, FrequencyPreset::Medium);
        assert_eq!(config.strategy, AnalysisStrategy::OddEvenBalance);
    }

    #[test]
    fn test_threshold_percent_clamped() {
        let mut config = EngineConfig::default();
        config.set_threshold_percent(250);
        assert_eq!(config.threshold, 1.0);

        config.set_threshold_percent(45);
        assert!((config.threshold - 0.45).abs() < 1e-6);

        config.set_threshold_percent(0);
        assert_eq!(config.threshold, 0.0);
    }

    #[test]
    fn test_preset_ranges() {
        let custom = FrequencyRange::new(600.0, 1200.0);
        assert_eq!(FrequencyPreset::Small.range(custom).min_hz, 1000.0);
        assert_eq!(FrequencyPreset::Small.range(custom).max_hz, 4000.0);
        assert_eq!(FrequencyPreset::Large.range(custom).max_hz, 2000.0);
        assert_eq!(FrequencyPreset::Custom.range(custom), custom);
    }

    #[test]
    fn test_custom_range_switches_preset() {
        let mut config = EngineConfig::default();
        config.set_custom_range(700.0, 2500.0);
        assert_eq!(config.preset, FrequencyPreset::Custom);
        assert_eq!(config.active_range().min_hz, 700.0);
        assert_eq!(config.active_range().max_hz, 2500.0);
    }

    #[test]
    fn test_custom_range_swaps_reversed_edges() {
        let range = FrequencyRange::new(3000.0, 500.0);
        assert_eq!(range.min_hz, 500.0);
        assert_eq!(range.max_hz, 3000.0);
    }
}
