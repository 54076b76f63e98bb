//! Audio Device Discovery

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Direction of an audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Input,
    Output,
}

/// Description of an audio device, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Human-readable device name, also used to select it
    pub name: String,

    pub device_type: DeviceType,

    /// Whether this is the system default device
    pub is_default: bool,

    /// Common sample rates the device supports (may be empty if querying failed)
    pub sample_rates: Vec<u32>,

    pub max_channels: u16,
}

impl AudioDevice {
    /// Every input and output device on the default host
    pub fn enumerate() -> EngineResult<Vec<AudioDevice>> {
        let host = cpal::default_host();
        let default_input = host.default_input_device().and_then(|d| d.name().ok());
        let default_output = host.default_output_device().and_then(|d| d.name().ok());

        let mut devices = Vec::new();
        if let Ok(inputs) = host.input_devices() {
            devices.extend(
                inputs.filter_map(|d| describe(&d, DeviceType::Input, default_input.as_deref())),
            );
        }
        if let Ok(outputs) = host.output_devices() {
            devices.extend(
                outputs.filter_map(|d| describe(&d, DeviceType::Output, default_output.as_deref())),
            );
        }

        if devices.is_empty() {
            return Err(EngineError::NoDevicesFound);
        }
        Ok(devices)
    }
}

fn describe(
    device: &cpal::Device,
    device_type: DeviceType,
    default_name: Option<&str>,
) -> Option<AudioDevice> {
    let name = device.name().ok()?;
    let is_default = default_name == Some(name.as_str());

    let (sample_rates, max_channels) = match device_type {
        DeviceType::Input => device
            .supported_input_configs()
            .map(supported_rates)
            .unwrap_or((vec![], 2)),
        DeviceType::Output => device
            .supported_output_configs()
            .map(supported_rates)
            .unwrap_or((vec![], 2)),
    };

    Some(AudioDevice {
        name,
        device_type,
        is_default,
        sample_rates,
        max_channels,
    })
}

fn supported_rates(
    configs: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
) -> (Vec<u32>, u16) {
    const COMMON_RATES: [u32; 4] = [22050, 44100, 48000, 96000];

    let mut sample_rates = Vec::new();
    let mut max_channels = 0u16;
    for config in configs {
        max_channels = max_channels.max(config.channels());
        let (min, max) = (config.min_sample_rate().0, config.max_sample_rate().0);
        for rate in COMMON_RATES {
            if (min..=max).contains(&rate) && !sample_rates.contains(&rate) {
                sample_rates.push(rate);
            }
        }
    }
    sample_rates.sort_unstable();
    (sample_rates, max_channels)
}

/// Output device by name, or the default when `name` is `None`
pub fn output_device(name: Option<&str>) -> EngineResult<cpal::Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or(EngineError::NoDevicesFound),
        Some(wanted) => host
            .output_devices()
            .map_err(|e| EngineError::DeviceNotFound(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| EngineError::DeviceNotFound(wanted.to_string())),
    }
}

/// Input device by name, or the default when `name` is `None`
pub fn input_device(name: Option<&str>) -> EngineResult<cpal::Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or(EngineError::NoDevicesFound),
        Some(wanted) => host
            .input_devices()
            .map_err(|e| EngineError::DeviceNotFound(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| EngineError::DeviceNotFound(wanted.to_string())),
    }
}
