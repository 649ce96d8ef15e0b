//! Timed listening sessions
//!
//! Owns the two mutually exclusive session types. A calibration session
//! only counts ticks (used to tune sensitivity); a measurement session
//! records tick timestamps for interval analysis. At most one session is
//! active at a time; starting another while one runs is rejected.
//!
//! Duration enforcement is both tick-driven (checked when a tick is
//! recorded) and frame-driven (checked on every processed frame), and both
//! paths converge on identical output. Completion consumes the session
//! state, so exactly one terminal outcome is produced per session even when
//! a manual stop races the deadline.

use std::mem;

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisStrategy, MeasurementOutcome};
use crate::audio::engine::EngineError;
use crate::PROGRESS_INTERVAL_SECONDS;

/// Terminal result of a calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Ticks accepted during the session
    pub tick_count: u32,
    /// Configured session duration in seconds
    pub duration_seconds: f64,
    /// `tick_count / duration_seconds` (configured duration, not elapsed,
    /// so a manual early stop is not rewarded with an inflated rate)
    pub ticks_per_second: f64,
}

/// A running calibration session
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    start_time: f64,
    duration: f64,
    tick_count: u32,
}

/// A running measurement session
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    start_time: f64,
    duration: f64,
    timestamps: Vec<f64>,
    /// Session time of the last progress notification
    last_progress: Option<f64>,
}

/// Session controller state
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session active
    #[default]
    Idle,
    /// Counting ticks
    Calibrating(CalibrationSession),
    /// Recording tick timestamps
    Measuring(MeasurementSession),
}

impl SessionState {
    /// Short name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Calibrating(_) => "calibration",
            Self::Measuring(_) => "measurement",
        }
    }

    /// True when no session is active
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Notification produced by a session transition or poll
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Emitted after each accepted calibration tick
    CalibrationProgress {
        /// Ticks accepted so far
        tick_count: u32,
        /// Seconds since session start
        elapsed: f64,
        /// Seconds until the deadline
        remaining: f64,
    },
    /// Calibration session finished (deadline or manual stop both converge here)
    CalibrationComplete(CalibrationResult),
    /// Throttled measurement progress, at most one per 100 ms of session time
    MeasurementProgress {
        /// Tick timestamps captured so far
        tick_count: usize,
        /// Seconds since session start
        elapsed: f64,
        /// Seconds until the deadline
        remaining: f64,
    },
    /// Measurement deadline fired and the analyzer ran
    MeasurementComplete(MeasurementOutcome),
}

/// Owns the session state machine
///
/// All methods take monotonic `now` in seconds from the caller, which keeps
/// the controller a pure function of its inputs and trivially testable.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
}

impl SessionController {
    /// Create an idle controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True when no session is active
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    fn ensure_idle(&self, requested: &'static str) -> Result<(), EngineError> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(EngineError::SessionActive {
                requested,
                active: self.state.name(),
            })
        }
    }

    /// Begin a calibration session of `duration_seconds`
    pub fn start_calibration(&mut self, now: f64, duration_seconds: f64) -> Result<(), EngineError> {
        self.ensure_idle("calibration")?;
        self.state = SessionState::Calibrating(CalibrationSession {
            start_time: now,
            duration: duration_seconds.max(0.0),
            tick_count: 0,
        });
        tracing::info!(duration_seconds, "calibration_started");
        Ok(())
    }

    /// Stop the calibration session early and return its result
    pub fn stop_calibration(&mut self) -> Result<CalibrationResult, EngineError> {
        match mem::take(&mut self.state) {
            SessionState::Calibrating(session) => {
                let result = Self::calibration_result(&session);
                tracing::info!(
                    tick_count = result.tick_count,
                    ticks_per_second = result.ticks_per_second,
                    "calibration_stopped"
                );
                Ok(result)
            }
            other => {
                self.state = other;
                Err(EngineError::NoSession {
                    expected: "calibration",
                })
            }
        }
    }

    /// Begin a measurement session of `duration_seconds`
    pub fn start_measurement(&mut self, now: f64, duration_seconds: f64) -> Result<(), EngineError> {
        self.ensure_idle("measurement")?;
        self.state = SessionState::Measuring(MeasurementSession {
            start_time: now,
            duration: duration_seconds.max(0.0),
            timestamps: Vec::new(),
            last_progress: None,
        });
        tracing::info!(duration_seconds, "measurement_started");
        Ok(())
    }

    /// Cancel the measurement session without producing a result
    ///
    /// This is a hard cancel, not a finish-early path: the captured
    /// timestamps are discarded and the analyzer never runs.
    pub fn stop_measurement(&mut self) -> Result<(), EngineError> {
        match mem::take(&mut self.state) {
            SessionState::Measuring(session) => {
                tracing::info!(
                    captured = session.timestamps.len(),
                    "measurement_cancelled"
                );
                Ok(())
            }
            other => {
                self.state = other;
                Err(EngineError::NoSession {
                    expected: "measurement",
                })
            }
        }
    }

    /// Clear accumulated state; permitted from `Idle` only
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.ensure_idle("reset")?;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Record an accepted tick at monotonic time `now`
    ///
    /// Outside a session the tick has no observable effect here (the caller
    /// still gets per-tick feedback from the detector). During calibration
    /// this increments the count and may complete the session; during
    /// measurement it appends the timestamp.
    pub fn record_tick(&mut self, now: f64) -> Option<SessionEvent> {
        match &mut self.state {
            SessionState::Idle => None,
            SessionState::Calibrating(session) => {
                session.tick_count += 1;
                let elapsed = now - session.start_time;
                if elapsed >= session.duration {
                    return Some(self.complete_calibration());
                }
                Some(SessionEvent::CalibrationProgress {
                    tick_count: session.tick_count,
                    elapsed,
                    remaining: session.duration - elapsed,
                })
            }
            SessionState::Measuring(session) => {
                session.timestamps.push(now);
                None
            }
        }
    }

    /// Poll deadlines and progress at monotonic time `now`
    ///
    /// Called once per processed frame. A calibration or measurement
    /// session whose deadline has passed completes here even if the clock
    /// has gone silent; an active measurement otherwise emits throttled
    /// progress. `strategy` selects the analyzer applied when a
    /// measurement completes.
    pub fn on_frame(&mut self, now: f64, strategy: AnalysisStrategy) -> Option<SessionEvent> {
        match &mut self.state {
            SessionState::Idle => None,
            SessionState::Calibrating(session) => {
                if now - session.start_time >= session.duration {
                    Some(self.complete_calibration())
                } else {
                    None
                }
            }
            SessionState::Measuring(session) => {
                let elapsed = now - session.start_time;
                if elapsed >= session.duration {
                    return Some(self.complete_measurement(strategy));
                }
                let due = session
                    .last_progress
                    .map_or(true, |t| now - t >= PROGRESS_INTERVAL_SECONDS);
                if due {
                    session.last_progress = Some(now);
                    Some(SessionEvent::MeasurementProgress {
                        tick_count: session.timestamps.len(),
                        elapsed,
                        remaining: (session.duration - elapsed).max(0.0),
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Consume the calibration session; deadline and manual stop converge here
    fn complete_calibration(&mut self) -> SessionEvent {
        match mem::take(&mut self.state) {
            SessionState::Calibrating(session) => {
                let result = Self::calibration_result(&session);
                tracing::info!(
                    tick_count = result.tick_count,
                    ticks_per_second = result.ticks_per_second,
                    "calibration_complete"
                );
                SessionEvent::CalibrationComplete(result)
            }
            _ => unreachable!("complete_calibration called outside Calibrating"),
        }
    }

    /// Consume the measurement session and run the configured analyzer
    fn complete_measurement(&mut self, strategy: AnalysisStrategy) -> SessionEvent {
        match mem::take(&mut self.state) {
            SessionState::Measuring(session) => {
                let outcome = strategy.analysis().analyze(&session.timestamps);
                tracing::info!(
                    captured = session.timestamps.len(),
                    degenerate = outcome.is_degenerate(),
                    "measurement_complete"
                );
                SessionEvent::MeasurementComplete(outcome)
            }
            _ => unreachable!("complete_measurement called outside Measuring"),
        }
    }

    fn calibration_result(session: &CalibrationSession) -> CalibrationResult {
        let ticks_per_second = if session.duration > 0.0 {
            f64::from(session.tick_count) / session.duration
        } else {
            0.0
        };
        CalibrationResult {
            tick_count: session.tick_count,
            duration_seconds: session.duration,
            ticks_per_second,
        }
    }
}
