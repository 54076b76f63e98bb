//! Microphone Level
//!
//! Captures the default input device and reduces it to one smoothed level
//! in [0, 1] for the animation engine. Samples travel from the cpal input
//! callback to the analyser through an rtrb ring buffer; the analysis runs
//! on the caller's thread in [`MicLevel::poll`], once per animation frame.
//!
//! Nothing here is fatal. No device, a denied permission or a stream error
//! all leave a constant level of 0.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::Stream;
use rtrb::{Consumer, RingBuffer};
use tracing::{info, warn};

use emopet_dsp::LevelMeter;

use crate::config::MicConfig;
use crate::device;
use crate::error::{EngineError, EngineResult};

struct Capture {
    // Held to keep the input flowing; dropping it tears the capture down
    _stream: Stream,
    consumer: Consumer<f32>,
    channels: usize,
    failed: Arc<AtomicBool>,
}

/// Smoothed microphone loudness
pub struct MicLevel {
    capture: Option<Capture>,
    meter: LevelMeter,
}

impl MicLevel {
    /// Start capturing; degrades to a silent meter on any failure
    pub fn open(config: &MicConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match start_capture(config) {
            Ok(capture) => Self {
                capture: Some(capture),
                meter: LevelMeter::new(),
            },
            Err(e) => {
                warn!("Microphone unavailable, level stays at 0: {}", e);
                Self::disabled()
            }
        }
    }

    /// A meter that always reads 0
    pub fn disabled() -> Self {
        Self {
            capture: None,
            meter: LevelMeter::new(),
        }
    }

    /// Whether samples are actually being captured
    pub fn is_active(&self) -> bool {
        self.capture
            .as_ref()
            .is_some_and(|c| !c.failed.load(Ordering::Relaxed))
    }

    /// Drain captured samples, run one analysis frame and return the level
    pub fn poll(&mut self) -> f32 {
        let Some(capture) = self.capture.as_mut() else {
            return 0.0;
        };
        if capture.failed.load(Ordering::Relaxed) {
            warn!("Microphone stream failed, level stays at 0");
            self.capture = None;
            self.meter.reset();
            return 0.0;
        }

        let available = capture.consumer.slots();
        if let Ok(chunk) = capture.consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            self.meter.push_samples(first, capture.channels);
            self.meter.push_samples(second, capture.channels);
            chunk.commit_all();
        }
        self.meter.update()
    }

    /// Level from the most recent poll
    pub fn level(&self) -> f32 {
        self.meter.level()
    }
}

fn start_capture(config: &MicConfig) -> EngineResult<Capture> {
    let device = device::input_device(config.input_device.as_deref())?;
    let supported = device
        .default_input_config()
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(EngineError::StreamBuildError(format!(
            "unsupported input sample format {:?}",
            supported.sample_format()
        )));
    }

    let stream_config: cpal::StreamConfig = supported.into();
    let channels = usize::from(stream_config.channels.max(1));
    let capacity = config.ring_buffer_frames.max(1) * channels;
    let (mut producer, consumer) = RingBuffer::<f32>::new(capacity);
    let failed = Arc::new(AtomicBool::new(false));
    let err_failed = Arc::clone(&failed);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Real-time audio callback - NO allocations allowed here.
                // When the analyser falls behind the newest samples are dropped.
                let n = data.len().min(producer.slots());
                if let Ok(chunk) = producer.write_chunk_uninit(n) {
                    let _ = chunk.fill_from_iter(data.iter().copied());
                }
            },
            move |err| {
                warn!("Microphone stream error: {}", err);
                err_failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

    info!(
        "Microphone capture started: {} Hz, {} ch",
        stream_config.sample_rate.0, channels
    );

    Ok(Capture {
        _stream: stream,
        consumer,
        channels,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_reads_zero() {
        let mut mic = MicLevel::disabled();
        assert!(!mic.is_active());
        for _ in 0..10 {
            assert_eq!(mic.poll(), 0.0);
        }
        assert_eq!(mic.level(), 0.0);
    }

    #[test]
    fn test_disabled_by_config() {
        let config = MicConfig {
            enabled: false,
            ..Default::default()
        };
        let mut mic = MicLevel::open(&config);
        assert!(!mic.is_active());
        assert_eq!(mic.poll(), 0.0);
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_default_input_capture() {
        let mut mic = MicLevel::open(&MicConfig::default());
        std::thread::sleep(std::time::Duration::from_millis(100));
        let level = mic.poll();
        assert!((0.0..=1.0).contains(&level));
    }
}
