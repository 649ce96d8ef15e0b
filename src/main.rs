//! Beatmeter - console monitor for clock beat measurement
//!
//! Captures the default (or a named) microphone, feeds the tick engine at
//! ~60 frames per second, and prints tick feedback, session progress, and
//! the final result as JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use beatmeter::{
    AnalysisStrategy, CaptureFormat, CaptureStream, EngineConfig, EngineEvent, FrequencyPreset,
    SpectrumAnalyser, TickEngine,
};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beatmeter=info".parse().unwrap()),
        )
        .init();

    println!("Beatmeter v{} - clock beat monitor", beatmeter::VERSION);
    println!();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let mut device_name: Option<String> = None;
    let mut calibrate = false;
    let mut duration_seconds = 10.0f64;
    let mut threshold_percent = 30u8;
    let mut config = EngineConfig::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--list" | "-l" => {
                list_devices()?;
                return Ok(());
            }
            "--version" | "-v" => {
                println!("beatmeter {}", beatmeter::VERSION);
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--calibrate" | "-c" => {
                calibrate = true;
                i += 1;
            }
            "--device" | "-d" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --device requires a device name");
                    return Ok(());
                }
                device_name = Some(args[i + 1].clone());
                i += 2;
            }
            "--duration" | "-t" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --duration requires seconds");
                    return Ok(());
                }
                match args[i + 1].parse() {
                    Ok(secs) => duration_seconds = secs,
                    Err(_) => {
                        eprintln!("Error: invalid duration: {}", args[i + 1]);
                        return Ok(());
                    }
                }
                i += 2;
            }
            "--threshold" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --threshold requires a percentage");
                    return Ok(());
                }
                match args[i + 1].parse() {
                    Ok(pct) => threshold_percent = pct,
                    Err(_) => {
                        eprintln!("Error: invalid threshold: {}", args[i + 1]);
                        return Ok(());
                    }
                }
                i += 2;
            }
            "--preset" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --preset requires small|medium|large");
                    return Ok(());
                }
                config.preset = match args[i + 1].as_str() {
                    "small" => FrequencyPreset::Small,
                    "medium" => FrequencyPreset::Medium,
                    "large" => FrequencyPreset::Large,
                    other => {
                        eprintln!("Error: unknown preset: {other}");
                        return Ok(());
                    }
                };
                i += 2;
            }
            "--strategy" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --strategy requires balance|deviation");
                    return Ok(());
                }
                config.strategy = match args[i + 1].as_str() {
                    "balance" => AnalysisStrategy::OddEvenBalance,
                    "deviation" => AnalysisStrategy::TikTakDeviation,
                    other => {
                        eprintln!("Error: unknown strategy: {other}");
                        return Ok(());
                    }
                };
                i += 2;
            }
            arg => {
                eprintln!("Unknown argument: {arg}");
                print_help();
                return Ok(());
            }
        }
    }

    config.set_threshold_percent(threshold_percent);

    // Acquire the capture device; failures here are device problems,
    // not engine errors
    let mut capture = match &device_name {
        Some(name) => CaptureStream::open_named(name)?,
        None => CaptureStream::open_default()?,
    };

    let fft_size = beatmeter::DEFAULT_FFT_SIZE;
    let mut analyser = SpectrumAnalyser::new(fft_size, capture.sample_rate());

    let mut engine = TickEngine::new(config);
    let events = engine.events();
    engine.initialize(CaptureFormat {
        sample_rate: capture.sample_rate(),
        fft_size,
    })?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::Relaxed);
    })?;

    if calibrate {
        info!(duration_seconds, "starting calibration");
        engine.start_calibration(duration_seconds)?;
    } else {
        info!(duration_seconds, "starting measurement");
        engine.start_measurement(duration_seconds)?;
    }

    let mut freq = vec![0u8; fft_size / 2];
    let mut time = vec![0u8; fft_size];

    loop {
        if stop.load(Ordering::Relaxed) {
            if calibrate {
                let result = engine.stop_calibration()?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                engine.stop_measurement()?;
                println!("measurement cancelled");
            }
            break;
        }

        capture.drain_into(&mut analyser);
        analyser.frequency_bytes(&mut freq);
        analyser.time_domain_bytes(&mut time);
        engine.process_frame(&freq, &time)?;

        let mut finished = false;
        for event in events.try_iter() {
            match event {
                EngineEvent::Level(_) => {}
                EngineEvent::Tick(tick) => {
                    println!("tick at {:.3}s", tick.timestamp);
                }
                EngineEvent::CalibrationProgress {
                    tick_count,
                    remaining,
                    ..
                } => {
                    println!("calibrating: {tick_count} ticks, {remaining:.1}s left");
                }
                EngineEvent::MeasurementProgress {
                    tick_count,
                    remaining,
                    ..
                } => {
                    // Progress arrives at most every 100 ms; print each second
                    if remaining.fract() < 0.02 {
                        println!("measuring: {tick_count} ticks, {remaining:.1}s left");
                    }
                }
                EngineEvent::CalibrationComplete(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    finished = true;
                }
                EngineEvent::MeasurementComplete(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    finished = true;
                }
            }
        }
        if finished {
            break;
        }

        std::thread::sleep(Duration::from_millis(16));
    }

    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = beatmeter::audio::capture::list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(());
    }
    println!("Input devices:");
    for device in devices {
        let default = if device.is_default { " (default)" } else { "" };
        let rate = device
            .sample_rate
            .map(|r| format!(" @ {r} Hz"))
            .unwrap_or_default();
        println!("  - {}{}{}", device.name, rate, default);
    }
    Ok(())
}

fn print_help() {
    println!("Usage: beatmeter [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -l, --list              List input devices and exit");
    println!("  -d, --device <NAME>     Capture from a named input device");
    println!("  -c, --calibrate         Run a tick-count calibration session");
    println!("  -t, --duration <SECS>   Session duration in seconds (default 10)");
    println!("      --threshold <PCT>   Detection threshold percentage (default 30)");
    println!("      --preset <NAME>     Clock size preset: small|medium|large");
    println!("      --strategy <NAME>   Analysis strategy: balance|deviation");
    println!("  -v, --version           Print version and exit");
    println!("  -h, --help              Print this help");
}
