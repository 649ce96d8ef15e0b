//! Audio processing: capture plumbing, frame analysis, level extraction,
//! tick detection, and the engine facade.

pub mod analyser;
pub mod capture;
pub mod detector;
pub mod engine;
pub mod level;

pub use analyser::SpectrumAnalyser;
pub use capture::CaptureStream;
pub use detector::TickDetector;
pub use engine::TickEngine;
pub use level::PeakMeter;
