//! cpal-based [`AudioHost`].
//!
//! [`CpalHost`] wraps one cpal [`Host`]: the platform default (ALSA,
//! CoreAudio, WASAPI) or a host picked by name, such as `"ASIO"` on Windows
//! builds with cpal's `asio` feature.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use patchbay_io::{AudioHost, CpalHost, Direction};
//!
//! let host = CpalHost::with_host_name("asio")?;
//! for device in host.list_devices()? {
//!     println!("{} ({} in / {} out)", device.name, device.input_channels, device.output_channels);
//! }
//! let rates = host.supported_sample_rates("Focusrite USB ASIO", Direction::Capture)?;
//! ```

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};

use crate::host::{
    AudioDevice, AudioHost, Direction, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
    StreamRequest, generic_channel_names, probe_sample_rates,
};
use crate::{Error, Result};

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Names of the cpal hosts compiled into this build.
pub fn available_host_names() -> Vec<&'static str> {
    cpal::available_hosts()
        .into_iter()
        .map(|id| id.name())
        .collect()
}

/// cpal-backed audio host.
pub struct CpalHost {
    host: Host,
}

impl CpalHost {
    /// Use the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal host initialized");
        Self { host }
    }

    /// Use the host whose name matches `name` (case-insensitive).
    pub fn with_host_name(name: &str) -> Result<Self> {
        let id = cpal::available_hosts()
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                Error::Unsupported(format!(
                    "audio host '{}' (available: {})",
                    name,
                    available_host_names().join(", ")
                ))
            })?;
        let host = cpal::host_from_id(id).map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(host = id.name(), "cpal host initialized");
        Ok(Self { host })
    }

    /// Find a cpal device by exact name, falling back to a case-insensitive
    /// fragment match.
    fn find_cpal_device(&self, name: &str, direction: Direction) -> Result<Device> {
        let devices: Vec<Device> = match direction {
            Direction::Capture => self.host.input_devices(),
            Direction::Playback => self.host.output_devices(),
        }
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();

        let named: Vec<(Device, String)> = devices
            .into_iter()
            .filter_map(|d| device_name(&d).ok().map(|n| (d, n)))
            .collect();

        if let Some((device, _)) = named.iter().find(|(_, n)| n == name) {
            return Ok(device.clone());
        }
        let search_lower = name.to_lowercase();
        named
            .into_iter()
            .find(|(_, n)| n.to_lowercase().contains(&search_lower))
            .map(|(d, _)| d)
            .ok_or_else(|| {
                Error::DeviceNotFound(format!("no {} device matching '{}'", direction, name))
            })
    }

    /// `(channels, min_rate, max_rate)` of every supported config range.
    fn config_ranges(device: &Device, direction: Direction) -> Vec<(u16, u32, u32)> {
        let collect = |ranges: Box<dyn Iterator<Item = cpal::SupportedStreamConfigRange>>| {
            ranges
                .map(|r| (r.channels(), r.min_sample_rate(), r.max_sample_rate()))
                .collect::<Vec<_>>()
        };
        match direction {
            Direction::Capture => device
                .supported_input_configs()
                .map(|r| collect(Box::new(r)))
                .unwrap_or_default(),
            Direction::Playback => device
                .supported_output_configs()
                .map(|r| collect(Box::new(r)))
                .unwrap_or_default(),
        }
    }

    fn max_channels(device: &Device, direction: Direction) -> u16 {
        Self::config_ranges(device, direction)
            .iter()
            .map(|&(channels, _, _)| channels)
            .max()
            .unwrap_or(0)
    }

    /// Stream config for `request`; asks for a fixed buffer only when the
    /// device advertises a range containing it.
    fn stream_config(
        request: &StreamRequest,
        supported: Option<&cpal::SupportedBufferSize>,
    ) -> cpal::StreamConfig {
        let fits = match supported {
            Some(cpal::SupportedBufferSize::Range { min, max }) => {
                (*min..=*max).contains(&request.buffer_frames)
            }
            _ => false,
        };
        cpal::StreamConfig {
            channels: request.channels,
            sample_rate: request.sample_rate,
            buffer_size: if fits {
                cpal::BufferSize::Fixed(request.buffer_frames)
            } else {
                cpal::BufferSize::Default
            },
        }
    }

    fn open_error(request: &StreamRequest, reason: impl ToString) -> Error {
        Error::DeviceOpen {
            device: request.device.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for CpalHost {
    fn name(&self) -> &str {
        self.host.id().name()
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        let devices = self
            .host
            .devices()
            .map_err(|e| Error::Stream(e.to_string()))?;

        let mut listed: Vec<AudioDevice> = Vec::new();
        for device in devices {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            if listed.iter().any(|d| d.name == name) {
                continue;
            }
            let input_channels = Self::max_channels(&device, Direction::Capture);
            let output_channels = Self::max_channels(&device, Direction::Playback);
            let default_sample_rate = device
                .default_input_config()
                .or_else(|_| device.default_output_config())
                .map(|c| c.sample_rate())
                .unwrap_or(48000);

            listed.push(AudioDevice {
                name,
                is_input: input_channels > 0,
                is_output: output_channels > 0,
                input_channels,
                output_channels,
                default_sample_rate,
            });
        }
        Ok(listed)
    }

    fn channel_names(&self, device: &str, direction: Direction) -> Result<Vec<String>> {
        let device = self.find_cpal_device(device, direction)?;
        Ok(generic_channel_names(
            direction,
            Self::max_channels(&device, direction),
        ))
    }

    fn supported_sample_rates(&self, device: &str, direction: Direction) -> Result<Vec<u32>> {
        let device = self.find_cpal_device(device, direction)?;
        let ranges: Vec<(u32, u32)> = Self::config_ranges(&device, direction)
            .into_iter()
            .map(|(_, min, max)| (min, max))
            .collect();
        Ok(probe_sample_rates(&ranges))
    }

    fn build_input_stream(
        &self,
        request: &StreamRequest,
        mut callback: InputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_cpal_device(&request.device, Direction::Capture)?;
        let buffer_range = device.default_input_config().ok().map(|c| *c.buffer_size());
        let stream_config = Self::stream_config(request, buffer_range.as_ref());

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Self::open_error(request, e))?;

        stream.play().map_err(|e| Self::open_error(request, e))?;
        tracing::info!(
            device = %request.device,
            channels = request.channels,
            sample_rate = request.sample_rate,
            buffer = ?stream_config.buffer_size,
            "input stream started"
        );

        Ok(StreamHandle::new(stream))
    }

    fn build_output_stream(
        &self,
        request: &StreamRequest,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_cpal_device(&request.device, Direction::Playback)?;
        let buffer_range = device.default_output_config().ok().map(|c| *c.buffer_size());
        let stream_config = Self::stream_config(request, buffer_range.as_ref());

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Self::open_error(request, e))?;

        stream.play().map_err(|e| Self::open_error(request, e))?;
        tracing::info!(
            device = %request.device,
            channels = request.channels,
            sample_rate = request.sample_rate,
            buffer = ?stream_config.buffer_size,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(buffer_frames: u32) -> StreamRequest {
        StreamRequest {
            device: "Speakers".to_string(),
            sample_rate: 48000,
            channels: 8,
            buffer_frames,
        }
    }

    #[test]
    fn fixed_buffer_only_inside_supported_range() {
        let range = cpal::SupportedBufferSize::Range { min: 64, max: 1024 };
        let config = CpalHost::stream_config(&request(256), Some(&range));
        assert_eq!(config.buffer_size, cpal::BufferSize::Fixed(256));
        assert_eq!(config.channels, 8);
        assert_eq!(config.sample_rate, 48000);

        let config = CpalHost::stream_config(&request(4096), Some(&range));
        assert_eq!(config.buffer_size, cpal::BufferSize::Default);

        let config = CpalHost::stream_config(&request(256), Some(&cpal::SupportedBufferSize::Unknown));
        assert_eq!(config.buffer_size, cpal::BufferSize::Default);
    }

    #[test]
    fn unknown_host_name_is_unsupported() {
        assert!(matches!(
            CpalHost::with_host_name("no-such-host"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn host_names_listed() {
        // At least the platform default is compiled in.
        assert!(!available_host_names().is_empty());
    }
}
