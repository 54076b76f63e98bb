//! Engine Configuration
//!
//! One JSON document configures the output stream, the sound engine, the
//! animation engine and the microphone. Every section has defaults, so a
//! partial (or empty) file is valid.
//!
//! # Storage Locations
//! - Linux: `~/.config/emopet/config.json`
//! - Windows: `%APPDATA%\emopet\config.json`
//! - macOS: `~/Library/Application Support/com.emopet.emopet/config.json`

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

/// Audio output stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of output channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,

    /// Output device name; `None` picks the system default
    pub output_device: Option<String>,

    /// Soft clipper threshold on the master bus, dB below full scale
    pub clip_threshold_db: f32,

    /// Capacity of the control → audio command channel
    pub command_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_size: 512,
            output_device: None,
            clip_threshold_db: emopet_dsp::DEFAULT_THRESHOLD_DB,
            command_capacity: 256,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.buffer_size < 32 || self.buffer_size > 8192 {
            return Err(format!("Invalid buffer size: {}", self.buffer_size));
        }
        if !(-24.0..=0.0).contains(&self.clip_threshold_db) {
            return Err(format!(
                "Invalid clip threshold: {} dB",
                self.clip_threshold_db
            ));
        }
        if self.command_capacity == 0 {
            return Err("Command channel capacity must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Sound engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Master gain before any preset adjusts it
    pub master_gain: f32,

    /// Time constant of the master gain approach on preset changes (seconds)
    pub gain_time_constant: f32,

    /// Extra time a voice stays registered after its lifetime (seconds)
    pub cleanup_grace: f32,

    /// Start with sound disabled; `play` is then dropped like before unlock
    pub muted: bool,

    /// Fixed RNG seed for reproducible bursts
    pub seed: Option<u64>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            master_gain: 0.22,
            gain_time_constant: 0.45,
            cleanup_grace: 0.25,
            muted: false,
            seed: None,
        }
    }
}

impl SoundConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.master_gain) {
            return Err(format!("Invalid master gain: {}", self.master_gain));
        }
        if !(self.gain_time_constant > 0.0) {
            return Err(format!(
                "Invalid gain time constant: {}",
                self.gain_time_constant
            ));
        }
        if !(self.cleanup_grace >= 0.0) {
            return Err(format!("Invalid cleanup grace: {}", self.cleanup_grace));
        }
        Ok(())
    }
}

/// Animation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Frames per second the host ticks the engine at
    pub fps: u32,

    /// Uniform enlargement applied to every eye rectangle
    pub eye_scale: f32,

    /// Automatic blinking on a random interval
    pub blinking: bool,

    /// Fixed RNG seed for reproducible motion
    pub seed: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            eye_scale: 1.5,
            blinking: true,
            seed: None,
        }
    }
}

impl AnimationConfig {
    /// Duration of one frame in milliseconds
    pub fn frame_ms(&self) -> f64 {
        1000.0 / f64::from(self.fps.max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fps == 0 || self.fps > 240 {
            return Err(format!("Invalid frame rate: {}", self.fps));
        }
        if !(self.eye_scale > 0.0 && self.eye_scale <= 4.0) {
            return Err(format!("Invalid eye scale: {}", self.eye_scale));
        }
        Ok(())
    }
}

/// Microphone level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicConfig {
    pub enabled: bool,

    /// Input device name; `None` picks the system default
    pub input_device: Option<String>,

    /// Ring buffer capacity between the input callback and the analyser
    pub ring_buffer_frames: usize,
}

impl Default for MicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input_device: None,
            ring_buffer_frames: 4096,
        }
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stream: StreamConfig,
    pub sound: SoundConfig,
    pub animation: AnimationConfig,
    pub mic: MicConfig,
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                buffer_size: 128, // ~2.6ms latency
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                buffer_size: 1024, // ~21ms latency
                command_capacity: 1024,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate every section
    pub fn validate(&self) -> EngineResult<()> {
        self.stream.validate().map_err(EngineError::ConfigError)?;
        self.sound.validate().map_err(EngineError::ConfigError)?;
        self.animation.validate().map_err(EngineError::ConfigError)?;
        if self.mic.ring_buffer_frames == 0 {
            return Err(EngineError::ConfigError(
                "Microphone ring buffer must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let file = fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Load from `path` (or the platform default location), falling back to
    /// defaults when the file is missing or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        if let Some(path) = path {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring configuration {:?}: {}", path, e),
                }
            }
        }

        info!("Using default configuration");
        Self::default()
    }

    /// Save to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Platform-specific configuration file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "emopet", "emopet")
            .map(|proj| proj.config_dir().join("config.json"))
    }
}
