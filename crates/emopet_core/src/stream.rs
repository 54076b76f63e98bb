//! Device Output Stream
//!
//! Plays the mixer through a cpal output stream.
//!
//! ```text
//! control thread                     audio thread ("emopet-audio")
//!   submit(cmd) ──crossbeam──▶  callback: drain commands → Mixer::render
//!   resume()/close() ─control─▶        → SoftClipper → device
//!   current_time() ◀──AtomicU64 frames──┘
//! ```
//!
//! A cpal `Stream` is not `Send` on every platform, so it lives on its own
//! thread for its whole life and is driven through a control channel.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use emopet_dsp::{Mixer, MixerCommand, SoftClipper};

use crate::config::StreamConfig;
use crate::device;
use crate::error::{EngineError, EngineResult};
use crate::output::{AudioOutput, OutputState};

/// State shared between the audio callback and the control thread
pub struct SharedState {
    /// Frames rendered so far; the output clock
    frames: AtomicU64,

    /// [`OutputState`] as a byte
    state: AtomicU8,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            frames: AtomicU64::new(0),
            state: AtomicU8::new(Self::encode(OutputState::Suspended)),
        }
    }

    fn encode(state: OutputState) -> u8 {
        match state {
            OutputState::Suspended => 0,
            OutputState::Running => 1,
            OutputState::Closed => 2,
        }
    }

    pub fn state(&self) -> OutputState {
        match self.state.load(Ordering::Acquire) {
            0 => OutputState::Suspended,
            1 => OutputState::Running,
            _ => OutputState::Closed,
        }
    }

    pub fn set_state(&self, state: OutputState) {
        self.state.store(Self::encode(state), Ordering::Release);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn add_frames(&self, frames: u64) {
        // Rust pattern: Relaxed is enough, the counter synchronizes nothing else
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

enum Control {
    Resume(Sender<EngineResult<()>>),
    Close,
}

/// Mixer playing through an audio device
pub struct DeviceOutput {
    commands: Sender<MixerCommand>,
    control: Sender<Control>,
    shared: Arc<SharedState>,
    sample_rate: u32,
    audio_thread: Option<JoinHandle<()>>,
}

impl DeviceOutput {
    /// Open the configured output device; the stream starts suspended
    pub fn open(config: &StreamConfig, master_gain: f32) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let (commands, command_rx) = bounded::<MixerCommand>(config.command_capacity);
        let (control, control_rx) = bounded::<Control>(4);
        let (ready_tx, ready_rx) = bounded::<EngineResult<()>>(1);
        let shared = Arc::new(SharedState::new());

        let thread_config = config.clone();
        let thread_shared = Arc::clone(&shared);
        let audio_thread = thread::Builder::new()
            .name("emopet-audio".into())
            .spawn(move || {
                let stream = match build_stream(&thread_config, master_gain, command_rx, thread_shared)
                {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_control_loop(&stream, &control_rx);
            })
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = audio_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = audio_thread.join();
                return Err(EngineError::StreamBuildError("audio thread exited".into()));
            }
        }

        info!(
            "Output stream opened: {} Hz, {} ch, {:.1}ms buffer",
            config.sample_rate,
            config.channels,
            config.latency_ms()
        );

        Ok(Self {
            commands,
            control,
            shared,
            sample_rate: config.sample_rate,
            audio_thread: Some(audio_thread),
        })
    }

    /// Factory opening a device output with `config` on first use
    pub fn factory(config: StreamConfig, master_gain: f32) -> crate::output::OutputFactory {
        Box::new(move || {
            let output = DeviceOutput::open(&config, master_gain)?;
            Ok(Box::new(output) as Box<dyn AudioOutput>)
        })
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }
}

fn build_stream(
    config: &StreamConfig,
    master_gain: f32,
    commands: Receiver<MixerCommand>,
    shared: Arc<SharedState>,
) -> EngineResult<Stream> {
    let device = device::output_device(config.output_device.as_deref())?;
    if let Ok(name) = device.name() {
        debug!("Using output device: {}", name);
    }

    let cpal_config = CpalStreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
    };
    let channels = usize::from(config.channels);
    let sample_rate = config.sample_rate as f32;

    // Rust pattern: everything the callback needs is moved into it, so the
    // audio thread never touches a lock
    let mut mixer = Mixer::new(sample_rate, master_gain)?;
    let clipper = SoftClipper::new(config.clip_threshold_db);

    let stream = device
        .build_output_stream(
            &cpal_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Real-time audio callback - NO allocations allowed here
                while let Ok(command) = commands.try_recv() {
                    mixer.apply(command);
                }
                mixer.render(data, channels);
                clipper.process(data);
                shared.add_frames((data.len() / channels) as u64);
            },
            move |err| {
                error!("Output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

    // Some hosts start streams on creation; stay silent until resumed
    let _ = stream.pause();
    Ok(stream)
}

fn run_control_loop(stream: &Stream, control: &Receiver<Control>) {
    while let Ok(message) = control.recv() {
        match message {
            Control::Resume(reply) => {
                let result = stream
                    .play()
                    .map_err(|e| EngineError::ResumeFailed(e.to_string()));
                let _ = reply.send(result);
            }
            Control::Close => break,
        }
    }
    if let Err(e) = stream.pause() {
        debug!("Pausing output on close failed: {}", e);
    }
}

impl AudioOutput for DeviceOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.shared.frames() as f64 / f64::from(self.sample_rate)
    }

    fn state(&self) -> OutputState {
        self.shared.state()
    }

    fn resume(&mut self) -> EngineResult<()> {
        match self.shared.state() {
            OutputState::Running => return Ok(()),
            OutputState::Closed => return Err(EngineError::OutputClosed),
            OutputState::Suspended => {}
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.control
            .send(Control::Resume(reply_tx))
            .map_err(|_| EngineError::ChannelSendError)?;
        reply_rx.recv().map_err(|_| EngineError::ChannelSendError)??;

        self.shared.set_state(OutputState::Running);
        debug!("Output stream running");
        Ok(())
    }

    fn submit(&mut self, command: MixerCommand) -> EngineResult<()> {
        if self.shared.state() == OutputState::Closed {
            return Err(EngineError::OutputClosed);
        }
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Mixer command queue full, dropping command");
                Err(EngineError::ChannelSendError)
            }
            Err(TrySendError::Disconnected(_)) => Err(EngineError::ChannelSendError),
        }
    }

    fn close(&mut self) {
        if self.shared.state() == OutputState::Closed {
            return;
        }
        self.shared.set_state(OutputState::Closed);
        let _ = self.control.send(Control::Close);
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
        info!("Output stream closed");
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.close();
    }
}
