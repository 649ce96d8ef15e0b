//! Tick engine facade
//!
//! Owns all engine state (configuration, peak meter, tick detector,
//! session controller) as one instance per capture lifetime; there are no
//! process-wide singletons. The engine is driven one frame at a time by an
//! external scheduler and never spawns threads or suspends.
//!
//! Notifications (loudness, ticks, progress, terminal results) go out over
//! a bounded lock-free channel; a lagging consumer drops events rather
//! than blocking the processing loop.

use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;

use crate::analysis::MeasurementOutcome;
use crate::audio::detector::{TickDetector, TickEvent};
use crate::audio::level::{self, PeakMeter};
use crate::config::{EngineConfig, FrequencyPreset};
use crate::session::{CalibrationResult, SessionController, SessionEvent, SessionState};

/// Capacity of the notification channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors from engine entry points
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("audio capture has not been initialized")]
    NotInitialized,

    #[error("cannot start {requested} session while {active} session is active")]
    SessionActive {
        requested: &'static str,
        active: &'static str,
    },

    #[error("no {expected} session is active")]
    NoSession { expected: &'static str },
}

/// Shape of the frames the capture subsystem delivers
///
/// Handed to [`TickEngine::initialize`] once a live source exists; the
/// engine needs it to map the configured frequency band onto FFT bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// FFT size; time-domain frames carry `fft_size` bytes, frequency
    /// frames `fft_size / 2`
    pub fft_size: usize,
}

/// Normalized loudness for one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    /// Instantaneous level, 0..=1
    pub level: f32,
    /// Hold-and-decay peak, 0..=1
    pub peak: f32,
}

/// Notification delivered over the engine's event channel
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Emitted once per processed frame
    Level(LoudnessSample),
    /// A detected tick, emitted whether or not a session is active
    Tick(TickEvent),
    /// Per-tick calibration progress
    CalibrationProgress {
        tick_count: u32,
        elapsed: f64,
        remaining: f64,
    },
    /// Calibration finished (deadline or manual stop)
    CalibrationComplete(CalibrationResult),
    /// Throttled measurement progress
    MeasurementProgress {
        tick_count: usize,
        elapsed: f64,
        remaining: f64,
    },
    /// Measurement deadline fired and analysis ran
    MeasurementComplete(MeasurementOutcome),
}

impl From<SessionEvent> for EngineEvent {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::CalibrationProgress {
                tick_count,
                elapsed,
                remaining,
            } => Self::CalibrationProgress {
                tick_count,
                elapsed,
                remaining,
            },
            SessionEvent::CalibrationComplete(result) => Self::CalibrationComplete(result),
            SessionEvent::MeasurementProgress {
                tick_count,
                elapsed,
                remaining,
            } => Self::MeasurementProgress {
                tick_count,
                elapsed,
                remaining,
            },
            SessionEvent::MeasurementComplete(outcome) => Self::MeasurementComplete(outcome),
        }
    }
}

/// The tick detection and timing engine
///
/// # Example
/// ```
/// use beatmeter::{CaptureFormat, EngineConfig, TickEngine};
///
/// let mut engine = TickEngine::new(EngineConfig::default());
/// engine.initialize(CaptureFormat { sample_rate: 44100, fft_size: 2048 }).unwrap();
///
/// let freq = vec![0u8; 1024];
/// let time = vec![128u8; 2048];
/// let sample = engine.process_frame(&freq, &time).unwrap();
/// assert_eq!(sample.level, 0.0);
/// ```
pub struct TickEngine {
    config: EngineConfig,
    format: Option<CaptureFormat>,
    /// Monotonic time origin, set at initialization
    origin: Option<Instant>,
    peak: PeakMeter,
    detector: TickDetector,
    controller: SessionController,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
}

impl TickEngine {
    /// Create an engine with the given configuration; not yet initialized
    pub fn new(config: EngineConfig) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            format: None,
            origin: None,
            peak: PeakMeter::new(),
            detector: TickDetector::new(),
            controller: SessionController::new(),
            event_tx,
            event_rx,
        }
    }

    /// A handle to the notification channel
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    /// Current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the whole configuration; takes effect on the next frame
    pub fn configure(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Set the detection threshold from a percentage, clamped to 0..=100
    pub fn set_threshold_percent(&mut self, percent: u8) {
        self.config.set_threshold_percent(percent);
    }

    /// Switch the frequency preset
    pub fn set_frequency_preset(&mut self, preset: FrequencyPreset) {
        self.config.set_frequency_preset(preset);
    }

    /// Set a custom band and switch the preset to `Custom`
    pub fn set_custom_range(&mut self, min_hz: f32, max_hz: f32) {
        self.config.set_custom_range(min_hz, max_hz);
    }

    /// Attach a live capture source
    ///
    /// Must be called before frames are processed or sessions started.
    /// Rejected while a session is active, since it restarts the engine's
    /// monotonic clock.
    pub fn initialize(&mut self, format: CaptureFormat) -> Result<(), EngineError> {
        if !self.controller.is_idle() {
            return Err(EngineError::SessionActive {
                requested: "initialize",
                active: self.controller.state().name(),
            });
        }
        self.format = Some(format);
        self.origin = Some(Instant::now());
        self.detector.reset();
        self.peak.reset();
        tracing::info!(
            sample_rate = format.sample_rate,
            fft_size = format.fft_size,
            "engine_initialized"
        );
        Ok(())
    }

    /// Whether a capture source has been attached
    pub fn is_initialized(&self) -> bool {
        self.format.is_some()
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        self.controller.state()
    }

    fn now(&self) -> Result<f64, EngineError> {
        self.origin
            .map(|origin| origin.elapsed().as_secs_f64())
            .ok_or(EngineError::NotInitialized)
    }

    fn emit(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            tracing::trace!("event_dropped");
        }
    }

    /// Process one audio frame using the engine's own monotonic clock
    ///
    /// Called once per available frame by the external capture driver.
    pub fn process_frame(
        &mut self,
        frequency_magnitudes: &[u8],
        time_samples: &[u8],
    ) -> Result<LoudnessSample, EngineError> {
        let now = self.now()?;
        self.process_frame_at(frequency_magnitudes, time_samples, now)
    }

    /// Process one audio frame at an explicit monotonic time
    ///
    /// The explicit-time entry point exists so a test harness or offline
    /// driver can feed synthetic frames without a live clock. `now` values
    /// must be non-decreasing across calls.
    pub fn process_frame_at(
        &mut self,
        frequency_magnitudes: &[u8],
        time_samples: &[u8],
        now: f64,
    ) -> Result<LoudnessSample, EngineError> {
        let format = self.format.ok_or(EngineError::NotInitialized)?;

        let range = self.config.active_range();
        let bins = level::band_to_bins(
            range.min_hz,
            range.max_hz,
            format.sample_rate,
            format.fft_size,
            frequency_magnitudes.len(),
        );
        let level = level::frame_level(frequency_magnitudes, time_samples, bins);
        let peak = self.peak.update(level, now * 1000.0);
        let sample = LoudnessSample { level, peak };
        self.emit(EngineEvent::Level(sample));

        // Deadline/progress poll runs before tick handling so a session
        // never absorbs ticks past its deadline, and progress is never
        // emitted after completion.
        if let Some(event) = self.controller.on_frame(now, self.config.strategy) {
            self.emit(event.into());
        }

        if let Some(tick) = self.detector.process(level, self.config.threshold, now) {
            self.emit(EngineEvent::Tick(tick));
            if let Some(event) = self.controller.record_tick(tick.timestamp) {
                self.emit(event.into());
            }
        }

        Ok(sample)
    }

    /// Start a calibration session of `duration_seconds`
    pub fn start_calibration(&mut self, duration_seconds: f64) -> Result<(), EngineError> {
        let now = self.now()?;
        self.detector.reset();
        self.controller.start_calibration(now, duration_seconds)
    }

    /// Stop the calibration session early and return its result
    ///
    /// The result is also delivered over the event channel, so channel
    /// consumers see every terminal outcome regardless of which path
    /// finished the session.
    pub fn stop_calibration(&mut self) -> Result<CalibrationResult, EngineError> {
        let result = self.controller.stop_calibration()?;
        self.emit(EngineEvent::CalibrationComplete(result.clone()));
        Ok(result)
    }

    /// Start a measurement session of `duration_seconds`
    ///
    /// Completion is automatic when the deadline passes; the result arrives
    /// as [`EngineEvent::MeasurementComplete`].
    pub fn start_measurement(&mut self, duration_seconds: f64) -> Result<(), EngineError> {
        let now = self.now()?;
        self.detector.reset();
        self.controller.start_measurement(now, duration_seconds)
    }

    /// Cancel the measurement session without producing a result
    pub fn stop_measurement(&mut self) -> Result<(), EngineError> {
        self.controller.stop_measurement()
    }

    /// Clear detector, peak meter, and session buffers; `Idle` only
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.controller.reset()?;
        self.detector.reset();
        self.peak.reset();
        Ok(())
    }
}

impl Default for TickEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
