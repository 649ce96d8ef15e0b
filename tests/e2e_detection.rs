//! E2E tests for tick detection and the loudness/peak pipeline
//!
//! Drives the engine with synthetic byte frames at explicit times, the way
//! the capture loop would, and checks the detection properties end to end.

use beatmeter::{CaptureFormat, EngineConfig, EngineEvent, TickEngine};

const FORMAT: CaptureFormat = CaptureFormat {
    sample_rate: 44100,
    fft_size: 2048,
};

fn engine() -> TickEngine {
    let mut engine = TickEngine::new(EngineConfig::default());
    engine.initialize(FORMAT).unwrap();
    engine
}

/// Build a frame whose time-domain RMS is approximately `level`
fn frame(level: f32) -> (Vec<u8>, Vec<u8>) {
    let amplitude = (level.clamp(0.0, 1.0) * 128.0).round() as i16;
    let time: Vec<u8> = (0..2048)
        .map(|i| {
            let centered = if i % 2 == 0 { -amplitude } else { amplitude };
            (128 + centered).clamp(0, 255) as u8
        })
        .collect();
    (vec![0u8; 1024], time)
}

fn tick_count(events: &crossbeam_channel::Receiver<EngineEvent>) -> usize {
    events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::Tick(_)))
        .count()
}

/// A loudness sequence crossing the threshold exactly once produces exactly
/// one tick, for any threshold setting
#[test]
fn test_single_crossing_single_tick_across_thresholds() {
    for threshold in (0..=90).step_by(10) {
        let mut engine = engine();
        engine.set_threshold_percent(threshold);
        let events = engine.events();

        let (qfreq, qtime) = frame(0.0);
        let (lfreq, ltime) = frame(1.0);

        for i in 0..10 {
            engine
                .process_frame_at(&qfreq, &qtime, f64::from(i) * 0.016)
                .unwrap();
        }
        engine.process_frame_at(&lfreq, &ltime, 0.2).unwrap();
        for i in 0..10 {
            engine
                .process_frame_at(&qfreq, &qtime, 0.3 + f64::from(i) * 0.016)
                .unwrap();
        }

        assert_eq!(
            tick_count(&events),
            1,
            "threshold {threshold}% should see exactly one tick"
        );
    }
}

/// Crossings closer than 100 ms are debounced into one tick; at 100 ms or
/// more they count separately
#[test]
fn test_debounce_boundary() {
    let (freq, time) = frame(1.0);

    let mut close = engine();
    let events = close.events();
    close.process_frame_at(&freq, &time, 1.0).unwrap();
    close.process_frame_at(&freq, &time, 1.09).unwrap();
    assert_eq!(tick_count(&events), 1, "crossings 90 ms apart are one tick");

    let mut apart = engine();
    let events = apart.events();
    apart.process_frame_at(&freq, &time, 1.0).unwrap();
    apart.process_frame_at(&freq, &time, 1.1).unwrap();
    assert_eq!(tick_count(&events), 2, "crossings 100 ms apart are two ticks");
}

/// A sustained loud signal only ticks at the debounce rate, not every frame
#[test]
fn test_sustained_signal_ticks_at_debounce_rate() {
    let mut engine = engine();
    let events = engine.events();
    let (freq, time) = frame(1.0);

    // 1 second of loud frames at 60 fps
    for i in 0..60 {
        engine
            .process_frame_at(&freq, &time, f64::from(i) / 60.0)
            .unwrap();
    }

    // 100 ms debounce caps acceptance at ~10 ticks/s
    let ticks = tick_count(&events);
    assert!(
        (9..=11).contains(&ticks),
        "expected ~10 ticks from 1 s of sustained signal, got {ticks}"
    );
}

/// Tick timestamps are strictly increasing
#[test]
fn test_tick_timestamps_strictly_increasing() {
    let mut engine = engine();
    let events = engine.events();
    let (freq, time) = frame(1.0);

    for i in 0..120 {
        engine
            .process_frame_at(&freq, &time, f64::from(i) / 60.0)
            .unwrap();
    }

    let timestamps: Vec<f64> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::Tick(tick) => Some(tick.timestamp),
            _ => None,
        })
        .collect();
    assert!(!timestamps.is_empty());
    for pair in timestamps.windows(2) {
        assert!(pair[1] > pair[0], "timestamps must strictly increase");
    }
}

/// The peak meter holds the maximum for 1500 ms of wall-clock time, then
/// decays to zero without ever going negative
#[test]
fn test_peak_hold_and_decay() {
    let mut engine = engine();
    let (lfreq, ltime) = frame(0.8);
    let (qfreq, qtime) = frame(0.0);

    let sample = engine.process_frame_at(&lfreq, &ltime, 0.0).unwrap();
    let held = sample.peak;
    assert!(held > 0.75, "peak should track the 0.8 level, got {held}");

    // Quiet frames inside the hold window: peak unchanged
    let mut now = 0.0;
    while now < 1.5 {
        now += 1.0 / 60.0;
        let sample = engine.process_frame_at(&qfreq, &qtime, now).unwrap();
        if now * 1000.0 <= 1500.0 {
            assert_eq!(sample.peak, held, "peak must hold for 1500 ms");
        }
    }

    // Past the hold: decays monotonically to zero, never negative
    let mut last = held;
    let mut reached_zero = false;
    for i in 0..400 {
        now = 1.6 + f64::from(i) / 60.0;
        let sample = engine.process_frame_at(&qfreq, &qtime, now).unwrap();
        assert!(sample.peak >= 0.0, "peak must never go negative");
        assert!(sample.peak <= last, "peak must not rise during decay");
        last = sample.peak;
        if sample.peak == 0.0 {
            reached_zero = true;
            break;
        }
    }
    assert!(reached_zero, "peak should reach zero, stuck at {last}");
}

/// The loudness level is the max of the two domain representations
#[test]
fn test_level_takes_stronger_domain() {
    let mut engine = engine();

    // Frequency-domain energy inside the default Medium band (0.8-3 kHz:
    // bins ~37..140 at 44.1 kHz / 2048), silent time domain
    let mut freq = vec![0u8; 1024];
    for m in &mut freq[40..120] {
        *m = 200;
    }
    let time = vec![128u8; 2048];
    let sample = engine.process_frame_at(&freq, &time, 0.0).unwrap();
    assert!(sample.level > 0.5, "frequency-domain path should register");

    // Time-domain energy with silent spectrum
    let (_, loud_time) = frame(0.9);
    let quiet_freq = vec![0u8; 1024];
    let sample = engine.process_frame_at(&quiet_freq, &loud_time, 0.2).unwrap();
    assert!(sample.level > 0.8, "time-domain path should register");
}
