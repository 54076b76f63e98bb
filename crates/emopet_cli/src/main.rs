//! EmoPet - terminal host
//!
//! Drives the eye animation and sound engines from a frame ticker and reads
//! commands from stdin. `--frames` renders offline and exits.

mod command;
mod pet;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emopet_core::{
    AudioDevice, AudioOutput, DeviceOutput, Emotion, EngineConfig, ManualClock, MicLevel,
    OfflineOutput, SystemClock,
};

use crate::command::Command;
use crate::pet::{log_summary, Pet};

#[derive(Parser, Debug)]
#[command(name = "emopet")]
#[command(about = "Emotion-driven pet eyes and voice")]
struct Args {
    /// Emotion to start with
    #[arg(long, default_value = "neutral")]
    emotion: Emotion,

    /// Animation frame rate (overrides the configuration)
    #[arg(long)]
    fps: Option<u32>,

    /// Start with sound muted
    #[arg(long)]
    mute: bool,

    /// Do not open the microphone
    #[arg(long)]
    no_mic: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render this many frames offline and exit
    #[arg(long)]
    frames: Option<u64>,

    /// Print SVG markup with each summary (or the last offline frame)
    #[arg(long)]
    svg: bool,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    #[arg(long, default_value = "emopet=debug")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if args.list_devices {
        return list_devices();
    }

    let mut config = EngineConfig::load_or_default(args.config.as_deref());
    if let Some(fps) = args.fps {
        config.animation.fps = fps;
    }
    if args.mute {
        config.sound.muted = true;
    }
    if args.no_mic || args.frames.is_some() {
        config.mic.enabled = false;
    }
    config.validate().context("invalid configuration")?;

    info!("Starting EmoPet ({})", args.emotion);

    match args.frames {
        Some(frames) => run_offline(&config, args.emotion, frames, args.svg),
        None => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to build runtime")?;
            runtime.block_on(run_live(config, args.emotion, args.svg))
        }
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn list_devices() -> anyhow::Result<()> {
    for device in AudioDevice::enumerate()? {
        println!(
            "{:?}\t{}{}\t{} ch\t{:?}",
            device.device_type,
            device.name,
            if device.is_default { " (default)" } else { "" },
            device.max_channels,
            device.sample_rates,
        );
    }
    Ok(())
}

async fn run_live(config: EngineConfig, emotion: Emotion, svg: bool) -> anyhow::Result<()> {
    let clock = Arc::new(SystemClock::new());
    let output = DeviceOutput::factory(config.stream.clone(), config.sound.master_gain);
    let mic = MicLevel::open(&config.mic);
    let mut pet = Pet::new(&config, output, clock, mic);

    if !pet.unlock() {
        warn!("Running without sound");
    }
    pet.set_emotion(emotion);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(
        config.animation.frame_ms() / 1000.0,
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_summary = f64::NEG_INFINITY;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = pet.frame();
                if frame.time_ms - last_summary >= 1000.0 {
                    last_summary = frame.time_ms;
                    log_summary(&frame, pet.sound());
                    if svg {
                        println!("{}", frame.to_svg());
                    }
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => pet.apply(command),
                        Err(e) => warn!("{}", e),
                    },
                    None => {
                        info!("stdin closed, press Ctrl-C to quit");
                        stdin_open = false;
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    pet.shutdown();
    info!("Goodbye");
    Ok(())
}

fn run_offline(
    config: &EngineConfig,
    emotion: Emotion,
    frames: u64,
    svg: bool,
) -> anyhow::Result<()> {
    let output = OfflineOutput::new(config.stream.sample_rate, config.sound.master_gain)?;
    let clock = ManualClock::new();
    let mut pet = Pet::new(
        config,
        output.factory(),
        Arc::new(clock.clone()),
        MicLevel::disabled(),
    );
    pet.unlock();
    pet.set_emotion(emotion);

    let frame_ms = config.animation.frame_ms();
    let samples_per_frame =
        (f64::from(config.stream.sample_rate) * frame_ms / 1000.0).round() as usize;
    let fps = u64::from(config.animation.fps.max(1));

    let mut peak = 0.0_f32;
    let mut last = None;
    for i in 0..frames {
        clock.set(i as f64 * frame_ms / 1000.0);
        let frame = pet.frame();
        let audio = output.render(samples_per_frame);
        peak = audio.iter().fold(peak, |p, s| p.max(s.abs()));
        if i % fps == 0 {
            log_summary(&frame, pet.sound());
        }
        last = Some(frame);
    }

    info!(
        "Rendered {} frames ({:.2}s of audio), peak {:.3}",
        frames,
        output.current_time(),
        peak
    );
    if let (true, Some(frame)) = (svg, last) {
        println!("{}", frame.to_svg());
    }

    pet.shutdown();
    Ok(())
}
