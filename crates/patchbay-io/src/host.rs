//! Pluggable audio host abstraction.
//!
//! The [`AudioHost`] trait is the only way the bridge reaches hardware. It is
//! a stateless query-and-open interface: list devices, describe one, open a
//! stream on it by name. The bridge receives it as `Arc<dyn AudioHost>`, so a
//! session can run against cpal in production and against [`MockHost`]
//! in tests without changing a line of bridge code.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │              Bridge              │
//! └──────────────┬───────────────────┘
//!                │ Arc<dyn AudioHost>
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │  CpalHost   │  │  MockHost   │
//! │ (ASIO, ALSA │  │ (hand-driven│
//! │  WASAPI...) │  │  callbacks) │
//! └─────────────┘  └─────────────┘
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe. Streams come
//! back as a type-erased [`StreamHandle`]; dropping it stops the stream and
//! unregisters its callbacks.
//!
//! [`MockHost`]: crate::MockHost

use std::fmt;

use patchbay_config::CANDIDATE_SAMPLE_RATES;

use crate::{Error, Result};

/// Stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Recording side; frames flow out of the device.
    Capture,
    /// Rendering side; frames flow into the device.
    Playback,
}

impl Direction {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Capture => "capture",
            Direction::Playback => "playback",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Maximum capture channels (0 when not an input).
    pub input_channels: u16,
    /// Maximum playback channels (0 when not an output).
    pub output_channels: u16,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

impl AudioDevice {
    /// Whether the device can stream in `direction`.
    pub fn supports(&self, direction: Direction) -> bool {
        match direction {
            Direction::Capture => self.is_input,
            Direction::Playback => self.is_output,
        }
    }

    /// Channel count available in `direction`.
    pub fn channels(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Capture => self.input_channels,
            Direction::Playback => self.output_channels,
        }
    }
}

/// Parameters for opening one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Exact device name, as returned by [`AudioHost::list_devices`].
    pub device: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Preferred buffer size in frames.
    pub buffer_frames: u32,
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops the
/// stream and its callbacks are never invoked again.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, kept alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Playback callback: fill an interleaved buffer of `frames × channels` samples.
///
/// Runs on the device's real-time thread. Must not allocate, lock, or block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Capture callback: consume an interleaved buffer of captured samples.
///
/// Same real-time rules as [`OutputCallback`].
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Error callback: a device-reported stream error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Device enumeration and stream construction.
pub trait AudioHost: Send + Sync {
    /// Human-readable host name (e.g. "ALSA", "ASIO", "mock").
    fn name(&self) -> &str;

    /// List all devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Names of the channels `device` exposes in `direction`, in channel order.
    fn channel_names(&self, device: &str, direction: Direction) -> Result<Vec<String>>;

    /// Sample rates `device` accepts in `direction`, ascending.
    fn supported_sample_rates(&self, device: &str, direction: Direction) -> Result<Vec<u32>>;

    /// Open a capture stream and start it.
    fn build_input_stream(
        &self,
        request: &StreamRequest,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Open a playback stream and start it.
    fn build_output_stream(
        &self,
        request: &StreamRequest,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Open the vendor configuration panel for `device`.
    fn show_control_panel(&self, device: &str) -> Result<()> {
        Err(Error::Unsupported(format!(
            "{} host has no control panel for '{}'",
            self.name(),
            device
        )))
    }

    /// Resolve a user-supplied device name or index for `direction`.
    fn find_device(&self, query: &str, direction: Direction) -> Result<AudioDevice> {
        let devices = self.list_devices()?;
        find_device_in(&devices, query, direction).cloned()
    }
}

/// Pick a device from `devices` usable in `direction`.
///
/// `query` is tried as an index into the matching devices, then as an exact
/// name, then as a case-insensitive name fragment. Several fragment matches
/// resolve to the first one.
pub fn find_device_in<'a>(
    devices: &'a [AudioDevice],
    query: &str,
    direction: Direction,
) -> Result<&'a AudioDevice> {
    let candidates: Vec<&AudioDevice> = devices.iter().filter(|d| d.supports(direction)).collect();

    if let Ok(index) = query.trim().parse::<usize>() {
        return candidates.get(index).copied().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{} device index {} (only {} devices available)",
                direction,
                index,
                candidates.len()
            ))
        });
    }

    if let Some(device) = candidates.iter().copied().find(|d| d.name == query) {
        return Ok(device);
    }

    let search_lower = query.trim().to_lowercase();
    let mut matches = candidates
        .iter()
        .copied()
        .filter(|d| d.name.to_lowercase().contains(&search_lower));
    let first = matches.next().ok_or_else(|| {
        Error::DeviceNotFound(format!("no {} device matching '{}'", direction, query))
    })?;
    if let Some(other) = matches.next() {
        tracing::warn!(
            query,
            chosen = %first.name,
            also = %other.name,
            "device name matches several devices; using the first"
        );
    }
    Ok(first)
}

/// Filter the candidate rate list down to those inside any `(min, max)` range.
pub fn probe_sample_rates(ranges: &[(u32, u32)]) -> Vec<u32> {
    CANDIDATE_SAMPLE_RATES
        .iter()
        .copied()
        .filter(|rate| ranges.iter().any(|&(min, max)| (min..=max).contains(rate)))
        .collect()
}

/// "Input 1", "Input 2", ... or "Output 1", ... for hosts without channel names.
pub fn generic_channel_names(direction: Direction, channels: u16) -> Vec<String> {
    let prefix = match direction {
        Direction::Capture => "Input",
        Direction::Playback => "Output",
    };
    (1..=channels).map(|n| format!("{} {}", prefix, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, inputs: u16, outputs: u16) -> AudioDevice {
        AudioDevice {
            name: name.to_string(),
            is_input: inputs > 0,
            is_output: outputs > 0,
            input_channels: inputs,
            output_channels: outputs,
            default_sample_rate: 48000,
        }
    }

    fn devices() -> Vec<AudioDevice> {
        vec![
            device("Focusrite USB ASIO", 2, 2),
            device("Speakers (Realtek)", 0, 8),
            device("Microphone (USB)", 1, 0),
        ]
    }

    #[test]
    fn find_by_exact_fragment_and_index() {
        let devices = devices();
        assert_eq!(
            find_device_in(&devices, "Speakers (Realtek)", Direction::Playback)
                .unwrap()
                .name,
            "Speakers (Realtek)"
        );
        assert_eq!(
            find_device_in(&devices, "focusrite", Direction::Capture)
                .unwrap()
                .name,
            "Focusrite USB ASIO"
        );
        // Index counts only devices usable in that direction.
        assert_eq!(
            find_device_in(&devices, "1", Direction::Capture).unwrap().name,
            "Microphone (USB)"
        );
    }

    #[test]
    fn direction_filters_candidates() {
        let devices = devices();
        assert!(matches!(
            find_device_in(&devices, "Speakers", Direction::Capture),
            Err(Error::DeviceNotFound(_))
        ));
        assert!(matches!(
            find_device_in(&devices, "7", Direction::Playback),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn probe_filters_candidates() {
        let rates = probe_sample_rates(&[(44100, 48000)]);
        assert_eq!(rates, vec![44100, 47250, 48000]);

        let rates = probe_sample_rates(&[(44100, 44100), (96000, 96000)]);
        assert_eq!(rates, vec![44100, 96000]);

        assert!(probe_sample_rates(&[]).is_empty());
    }

    #[test]
    fn generic_names() {
        assert_eq!(
            generic_channel_names(Direction::Capture, 2),
            vec!["Input 1", "Input 2"]
        );
        assert!(generic_channel_names(Direction::Playback, 0).is_empty());
    }

    #[test]
    fn stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{:?}", handle).contains("StreamHandle"));
    }
}
