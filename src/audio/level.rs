//! Loudness extraction and peak metering
//!
//! Converts one analyser frame (byte frequency magnitudes plus byte
//! time-domain samples) into a single normalized loudness value, and tracks
//! a hold-and-decay peak indicator for the UI meter.
//!
//! The frequency-domain RMS is band-limited to the configured clock band;
//! the time-domain RMS stays broadband as a transient safety net. The final
//! level is the maximum of the two, since a short mechanical click may show
//! strongly in only one representation.

use std::ops::Range;

use crate::{PEAK_DECAY_PER_FRAME, PEAK_HOLD_MS};

/// Map a frequency band in Hz to a range of FFT bin indices
///
/// Bin resolution is `sample_rate / fft_size`; bin `i` covers frequencies
/// around `i * sample_rate / fft_size`. The returned range is clamped to
/// `bin_count` and is empty when the band lies entirely above Nyquist.
pub fn band_to_bins(
    min_hz: f32,
    max_hz: f32,
    sample_rate: u32,
    fft_size: usize,
    bin_count: usize,
) -> Range<usize> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    if hz_per_bin <= 0.0 {
        return 0..0;
    }
    let lo = (min_hz / hz_per_bin).floor().max(0.0) as usize;
    let hi = (max_hz / hz_per_bin).ceil() as usize + 1;
    let lo = lo.min(bin_count);
    let hi = hi.min(bin_count);
    lo..hi.max(lo)
}

/// RMS of byte frequency magnitudes over `bins`, normalized to 0..=1
///
/// Returns 0.0 for an empty bin range.
pub fn frequency_level(magnitudes: &[u8], bins: Range<usize>) -> f32 {
    let slice = &magnitudes[bins.start.min(magnitudes.len())..bins.end.min(magnitudes.len())];
    if slice.is_empty() {
        return 0.0;
    }
    let sum: f64 = slice.iter().map(|&m| f64::from(m) * f64::from(m)).sum();
    let rms = (sum / slice.len() as f64).sqrt();
    (rms / 255.0) as f32
}

/// RMS of byte time-domain samples centered around 128, normalized to 0..=1
pub fn time_level(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let centered = (f64::from(s) - 128.0) / 128.0;
            centered * centered
        })
        .sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Combined loudness for one frame: max of band-limited frequency RMS and
/// broadband time-domain RMS
pub fn frame_level(magnitudes: &[u8], samples: &[u8], bins: Range<usize>) -> f32 {
    frequency_level(magnitudes, bins).max(time_level(samples))
}

/// Hold-and-decay peak indicator
///
/// Holds the recent maximum level for [`PEAK_HOLD_MS`] of wall-clock time,
/// then decays by a fixed amount per processed frame until it reaches zero.
/// The hold comparison is wall-clock (frame-rate independent); the decay is
/// per-frame, matching the visual meter's intended behaviour. This is a
/// display aid, not a physical measurement.
///
/// # Example
/// ```
/// use beatmeter::PeakMeter;
///
/// let mut meter = PeakMeter::new();
/// meter.update(0.8, 0.0);
/// assert_eq!(meter.peak(), 0.8);
/// // Still held 1s later
/// meter.update(0.0, 1000.0);
/// assert_eq!(meter.peak(), 0.8);
/// ```
#[derive(Debug, Clone)]
pub struct PeakMeter {
    /// Current peak value, 0..=1
    peak: f32,
    /// Wall-clock ms when the hold started, `None` once fully decayed
    hold_start_ms: Option<f64>,
    /// Hold duration in ms
    hold_ms: f64,
    /// Decay per processed frame
    decay_per_frame: f32,
}

impl PeakMeter {
    /// Create a meter with the default hold and decay constants
    pub fn new() -> Self {
        Self::with_params(PEAK_HOLD_MS, PEAK_DECAY_PER_FRAME)
    }

    /// Create a meter with explicit hold duration and per-frame decay
    pub fn with_params(hold_ms: f64, decay_per_frame: f32) -> Self {
        Self {
            peak: 0.0,
            hold_start_ms: None,
            hold_ms,
            decay_per_frame,
        }
    }

    /// Feed one frame's level at wall-clock time `now_ms`
    ///
    /// Returns the peak value after the update.
    pub fn update(&mut self, level: f32, now_ms: f64) -> f32 {
        if level >= self.peak {
            self.peak = level;
            self.hold_start_ms = Some(now_ms);
        } else if let Some(start) = self.hold_start_ms {
            if now_ms - start > self.hold_ms {
                self.peak = (self.peak - self.decay_per_frame).max(0.0);
                if self.peak == 0.0 {
                    self.hold_start_ms = None;
                }
            }
        }
        self.peak
    }

    /// Current peak value
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Clear the peak and hold timer
    pub fn reset(&mut self) {
        self.peak = 0.0;
        self.hold_start_ms = None;
    }
}

impl Default for PeakMeter {
    fn default() -> Self {
        Self::new()
    }
}
