//! Spectrum analyser for the capture path
//!
//! Converts raw f32 capture samples into the byte frequency/time frames the
//! engine consumes: a sliding window of `fft_size` samples, a
//! Blackman-windowed FFT with magnitude smoothing over time, and dB
//! magnitudes mapped from [-100 dB, -30 dB] into 0..=255. Byte time-domain
//! data is the current window mapped to 0..=255 around the 128 zero line.
//!
//! The frame contract matches what the engine's level extractor expects:
//! `fft_size` time-domain bytes paired with `fft_size / 2` frequency bytes.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Default magnitude smoothing factor over time
const DEFAULT_SMOOTHING: f32 = 0.1;

/// dB value mapped to byte 0
const MIN_DECIBELS: f32 = -100.0;

/// dB value mapped to byte 255
const MAX_DECIBELS: f32 = -30.0;

/// Sliding-window FFT analyser producing byte frames
///
/// # Example
/// ```
/// use beatmeter::SpectrumAnalyser;
///
/// let mut analyser = SpectrumAnalyser::new(2048, 44100);
/// analyser.push_samples(&vec![0.0f32; 2048]);
///
/// let mut freq = vec![0u8; analyser.bin_count()];
/// let mut time = vec![0u8; analyser.fft_size()];
/// analyser.frequency_bytes(&mut freq);
/// analyser.time_domain_bytes(&mut time);
/// assert!(time.iter().all(|&b| b == 128));
/// ```
pub struct SpectrumAnalyser {
    fft_size: usize,
    sample_rate: u32,
    /// Previous-magnitude weight, 0..=1
    smoothing: f32,
    /// Blackman window coefficients
    window: Vec<f32>,
    /// Last `fft_size` samples
    samples: VecDeque<f32>,
    /// Smoothed bin magnitudes
    smoothed: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    /// Reused FFT input/output buffer
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    /// Create an analyser for `fft_size` (must be a power of two) at `sample_rate`
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        assert!(
            fft_size.is_power_of_two() && fft_size >= 32,
            "fft_size must be a power of two >= 32"
        );

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Blackman window, the same taper WebAudio's analyser applies
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (std::f32::consts::TAU * x).cos()
                    + 0.08 * (2.0 * std::f32::consts::TAU * x).cos()
            })
            .collect();

        Self {
            fft_size,
            sample_rate,
            smoothing: DEFAULT_SMOOTHING,
            window,
            samples: VecDeque::with_capacity(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            fft,
            scratch: vec![Complex::default(); fft_size],
        }
    }

    /// FFT size in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins (`fft_size / 2`)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Set the smoothing factor (previous-magnitude weight), clamped to 0..=1
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    /// Append captured samples to the sliding window
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &s in samples {
            if self.samples.len() == self.fft_size {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
        }
    }

    /// Number of samples currently in the window
    pub fn buffered(&self) -> usize {
        self.samples.len()
    }

    /// Write the current window as byte time-domain data
    ///
    /// `out` must hold `fft_size` bytes. A partially filled window is
    /// left-padded with the 128 zero line.
    pub fn time_domain_bytes(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.fft_size);
        let pad = self.fft_size.saturating_sub(self.samples.len());
        for b in &mut out[..pad] {
            *b = 128;
        }
        for (b, &s) in out[pad..].iter_mut().zip(self.samples.iter()) {
            *b = (s.clamp(-1.0, 1.0) * 128.0 + 128.0).clamp(0.0, 255.0) as u8;
        }
    }

    /// Run the FFT over the current window and write byte frequency data
    ///
    /// `out` must hold `fft_size / 2` bytes. Magnitudes are smoothed over
    /// time before the dB conversion, so repeated calls converge on a
    /// steady signal.
    pub fn frequency_bytes(&mut self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.fft_size / 2);

        let pad = self.fft_size.saturating_sub(self.samples.len());
        for c in &mut self.scratch[..pad] {
            *c = Complex::default();
        }
        for ((c, &s), &w) in self.scratch[pad..]
            .iter_mut()
            .zip(self.samples.iter())
            .zip(self.window[pad..].iter())
        {
            *c = Complex::new(s * w, 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (i, (prev, b)) in self.smoothed.iter_mut().zip(out.iter_mut()).enumerate() {
            let magnitude = self.scratch[i].norm() * scale;
            *prev = tau * *prev + (1.0 - tau) * magnitude;
            let db = 20.0 * prev.max(f32::MIN_POSITIVE).log10();
            *b = (255.0 * (db - MIN_DECIBELS) / range).clamp(0.0, 255.0) as u8;
        }
    }

    /// Clear the window and smoothing history
    pub fn reset(&mut self) {
        self.samples.clear();
        self.smoothed.fill(0.0);
    }
}
