//! Tick event detection
//!
//! Applies the sensitivity threshold and a 100 ms debounce to the loudness
//! stream. The debounce rejects double-triggering on a single mechanical
//! click's decay tail. No tick "type" (tik vs tak) is assigned here; how a
//! tick is accounted for is the session controller's concern.

use crate::DEBOUNCE_SECONDS;

/// A single detected acoustic transient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    /// Monotonic time of detection in seconds
    pub timestamp: f64,
}

/// Threshold-plus-debounce tick detector
///
/// # Example
/// ```
/// use beatmeter::TickDetector;
///
/// let mut detector = TickDetector::new();
/// assert!(detector.process(0.5, 0.3, 1.0).is_some());
/// // 50 ms later: inside the debounce window, rejected
/// assert!(detector.process(0.5, 0.3, 1.05).is_none());
/// // 100 ms later: accepted again
/// assert!(detector.process(0.5, 0.3, 1.1).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TickDetector {
    /// Time of the last accepted tick, `None` before the first
    last_tick: Option<f64>,
}

impl TickDetector {
    /// Create a detector with no accepted-tick history
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one frame's loudness at monotonic time `now`
    ///
    /// A tick is accepted when `level` strictly exceeds `threshold` and at
    /// least [`DEBOUNCE_SECONDS`] have passed since the last accepted tick.
    pub fn process(&mut self, level: f32, threshold: f32, now: f64) -> Option<TickEvent> {
        if level <= threshold {
            return None;
        }
        if let Some(last) = self.last_tick {
            if now - last < DEBOUNCE_SECONDS {
                return None;
            }
        }
        self.last_tick = Some(now);
        tracing::debug!(timestamp = now, level, "tick_detected");
        Some(TickEvent { timestamp: now })
    }

    /// Time of the last accepted tick
    pub fn last_tick(&self) -> Option<f64> {
        self.last_tick
    }

    /// Forget the accepted-tick history
    ///
    /// Sessions start with a cleared detector so the first tick of a new
    /// session is never debounced against the previous one.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}
