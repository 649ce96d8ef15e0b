//! Beatmeter - tick detection and beat-timing analysis for mechanical clocks
//!
//! This library turns a live audio stream into timing statistics about a
//! mechanical clock's tick/tock sound, so a technician can judge regulation
//! quality (beat error / escapement balance). The core is [`TickEngine`]:
//! it converts audio frames into a normalized loudness signal, detects
//! debounced tick events against a configurable threshold, runs timed
//! calibration and measurement sessions, and reduces captured tick
//! timestamps to interval-balance statistics.
//!
//! The engine itself is single-threaded and frame-driven: an external
//! scheduler (the capture loop in `main.rs`, or a test harness) calls
//! `process_frame` once per available audio frame. Capture plumbing lives
//! in [`audio::capture`] and [`audio::analyser`] and never crosses the
//! engine's data contracts.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod session;

pub use analysis::{
    AnalysisStrategy, BalanceAnalysis, BalanceResult, DeviationAnalysis, DeviationResult,
    IntervalAnalysis, MeasurementOutcome,
};
pub use audio::analyser::SpectrumAnalyser;
pub use audio::capture::{CaptureError, CaptureStream};
pub use audio::detector::{TickDetector, TickEvent};
pub use audio::engine::{CaptureFormat, EngineError, EngineEvent, LoudnessSample, TickEngine};
pub use audio::level::PeakMeter;
pub use config::{EngineConfig, FrequencyPreset, FrequencyRange};
pub use session::{CalibrationResult, SessionController, SessionState};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default FFT size for the capture-side analyser (matches the original
/// WebAudio analyser configuration)
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Default capture sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Minimum spacing between accepted ticks in seconds (debounce window)
pub const DEBOUNCE_SECONDS: f64 = 0.1;

/// Peak meter hold duration in wall-clock milliseconds before decay starts
pub const PEAK_HOLD_MS: f64 = 1500.0;

/// Peak meter decay per processed frame once the hold elapses
pub const PEAK_DECAY_PER_FRAME: f32 = 0.003;

/// Minimum spacing between measurement progress notifications in seconds
pub const PROGRESS_INTERVAL_SECONDS: f64 = 0.1;
