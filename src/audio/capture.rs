//! Microphone capture plumbing
//!
//! Opens an input stream on the default (or a named) audio host device and
//! moves mono-downmixed samples into a lock-free ring buffer. The audio
//! callback only pushes into the ring; the processing thread drains it into
//! the [`SpectrumAnalyser`](super::analyser::SpectrumAnalyser) at its own
//! cadence. Device-acquisition failures surface as [`CaptureError`] so the
//! caller can tell "no microphone" apart from engine misuse.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use thiserror::Error;

use super::analyser::SpectrumAnalyser;

/// Ring buffer size in samples (~1.5 s at 44.1 kHz)
const RING_BUFFER_SIZE: usize = 65536;

/// Errors raised while acquiring or running the input device
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no input device available")]
    NoInputDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("unsupported input configuration: {0}")]
    UnsupportedConfig(String),

    #[error("failed to open input stream: {0}")]
    StreamError(String),
}

/// Basic information about an input device
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the host's default input
    pub is_default: bool,
    /// Default sample rate, if the device reports one
    pub sample_rate: Option<u32>,
}

/// List input devices on the default host
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    let iter = host
        .input_devices()
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;
    for device in iter {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        devices.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            sample_rate: device.default_input_config().map(|c| c.sample_rate().0).ok(),
            name,
        });
    }
    Ok(devices)
}

/// A running input stream feeding a ring buffer
///
/// Dropping the stream stops capture.
pub struct CaptureStream {
    _stream: Stream,
    consumer: ringbuf::HeapCons<f32>,
    sample_rate: u32,
    /// Reused drain buffer
    scratch: Vec<f32>,
}

impl CaptureStream {
    /// Open the default input device
    pub fn open_default() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        Self::open(device)
    }

    /// Open a named input device on the default host
    pub fn open_named(name: &str) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .input_devices()
            .map_err(|e| CaptureError::StreamError(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?;
        Self::open(device)
    }

    fn open(device: Device) -> Result<Self, CaptureError> {
        let default_config = device
            .default_input_config()
            .map_err(|e| CaptureError::UnsupportedConfig(e.to_string()))?;
        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels();

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (mut producer, consumer) = ring.split();

        let num_channels = channels as usize;
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Mono downmix; overruns drop the newest samples
                    for frame in data.chunks(num_channels) {
                        let sum: f32 = frame.iter().sum();
                        let _ = producer.try_push(sum / num_channels as f32);
                    }
                },
                move |err| {
                    tracing::error!("input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            "capture_started"
        );

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
            scratch: vec![0.0; RING_BUFFER_SIZE / 2],
        })
    }

    /// Effective capture sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples currently waiting in the ring
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Drain pending samples into the analyser's sliding window
    ///
    /// Returns the number of samples moved.
    pub fn drain_into(&mut self, analyser: &mut SpectrumAnalyser) -> usize {
        let mut moved = 0;
        loop {
            let read = self.consumer.pop_slice(&mut self.scratch);
            if read == 0 {
                break;
            }
            analyser.push_samples(&self.scratch[..read]);
            moved += read;
        }
        moved
    }
}
