//! Session file format and operations.

use std::path::Path;
use std::time::Duration;

use patchbay_core::{
    ChannelLayout, ChannelMapping, ConfigurationError, MeterBallistics, duration_to_frames,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_session};

/// Session format version written by this build.
pub const SESSION_VERSION: u32 = 1;

/// One routing session: which device feeds which, how channels map, and how
/// much buffering to keep between them.
///
/// # TOML Format
///
/// ```toml
/// version = 1
/// target_latency_ms = 20.0
/// max_buffer_ms = 250.0
/// block_frames = 256
///
/// [capture]
/// device = "Focusrite USB ASIO"
/// sample_rate = 48000
/// channels = 2
///
/// [playback]
/// device = "Speakers"
/// layout = "7.1"
///
/// [mapping]
/// # output index -> input index; absent outputs are silent
/// routes = [[0, 0], [1, 1]]
///
/// [metering]
/// enabled = true
/// peak_release_ms = 300.0
/// rms_window_ms = 50.0
/// ```
///
/// Omitting `[mapping]` (or leaving `routes` empty) selects round-robin
/// routing: output `i` reads input `i % channels`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Format version; must equal [`SESSION_VERSION`].
    #[serde(default = "default_version")]
    pub version: u32,

    /// Silence primed into the ring at start, in milliseconds.
    #[serde(default = "default_target_latency_ms")]
    pub target_latency_ms: f32,

    /// Ring capacity, in milliseconds.
    #[serde(default = "default_max_buffer_ms")]
    pub max_buffer_ms: f32,

    /// Preferred device buffer size, in frames.
    #[serde(default = "default_block_frames")]
    pub block_frames: u32,

    /// Capture side.
    pub capture: CaptureConfig,

    /// Playback side.
    pub playback: PlaybackConfig,

    /// Output-to-input routing.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Meter settings.
    #[serde(default)]
    pub metering: MeteringConfig,
}

/// Capture device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Device name as reported by the host.
    pub device: String,

    /// Session sample rate, shared by both devices.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of capture channels (M).
    #[serde(default = "default_capture_channels")]
    pub channels: usize,
}

/// Playback device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Device name as reported by the host.
    pub device: String,

    /// Speaker layout; its channel count is K.
    #[serde(default)]
    pub layout: ChannelLayout,
}

/// Routing table as `[output, input]` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingConfig {
    /// Explicit routes. Empty means round-robin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<(usize, usize)>,
}

/// Meter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeteringConfig {
    /// Compute meters in the playback callback.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Peak release time constant.
    #[serde(default = "default_peak_release_ms")]
    pub peak_release_ms: f32,

    /// RMS window length.
    #[serde(default = "default_rms_window_ms")]
    pub rms_window_ms: f32,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        let ballistics = MeterBallistics::default();
        Self {
            enabled: true,
            peak_release_ms: ballistics.peak_release_ms,
            rms_window_ms: ballistics.rms_window_ms,
        }
    }
}

impl MeteringConfig {
    /// Ballistics for a [`patchbay_core::LevelMeter`].
    pub fn ballistics(&self) -> MeterBallistics {
        MeterBallistics {
            peak_release_ms: self.peak_release_ms,
            rms_window_ms: self.rms_window_ms,
        }
    }
}

fn default_version() -> u32 {
    SESSION_VERSION
}

fn default_target_latency_ms() -> f32 {
    20.0
}

fn default_max_buffer_ms() -> f32 {
    250.0
}

fn default_block_frames() -> u32 {
    256
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_capture_channels() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_peak_release_ms() -> f32 {
    MeterBallistics::default().peak_release_ms
}

fn default_rms_window_ms() -> f32 {
    MeterBallistics::default().rms_window_ms
}

impl SessionConfig {
    /// Create a session with default settings between two devices.
    pub fn new(capture_device: impl Into<String>, playback_device: impl Into<String>) -> Self {
        Self {
            version: SESSION_VERSION,
            target_latency_ms: default_target_latency_ms(),
            max_buffer_ms: default_max_buffer_ms(),
            block_frames: default_block_frames(),
            capture: CaptureConfig {
                device: capture_device.into(),
                sample_rate: default_sample_rate(),
                channels: default_capture_channels(),
            },
            playback: PlaybackConfig {
                device: playback_device.into(),
                layout: ChannelLayout::default(),
            },
            mapping: MappingConfig::default(),
            metering: MeteringConfig::default(),
        }
    }

    /// Set the session sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.capture.sample_rate = sample_rate;
        self
    }

    /// Set the capture channel count.
    pub fn with_capture_channels(mut self, channels: usize) -> Self {
        self.capture.channels = channels;
        self
    }

    /// Set the playback layout.
    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.playback.layout = layout;
        self
    }

    /// Route capture channel `input` to playback channel `output`.
    pub fn with_route(mut self, output: usize, input: usize) -> Self {
        self.mapping.routes.push((output, input));
        self
    }

    /// Add several routes.
    pub fn with_routes(mut self, routes: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.mapping.routes.extend(routes);
        self
    }

    /// Set the latency cushion.
    pub fn with_target_latency_ms(mut self, ms: f32) -> Self {
        self.target_latency_ms = ms;
        self
    }

    /// Set the ring capacity.
    pub fn with_max_buffer_ms(mut self, ms: f32) -> Self {
        self.max_buffer_ms = ms;
        self
    }

    /// Set the preferred device buffer size.
    pub fn with_block_frames(mut self, frames: u32) -> Self {
        self.block_frames = frames;
        self
    }

    /// Turn metering on or off.
    pub fn with_metering(mut self, enabled: bool) -> Self {
        self.metering.enabled = enabled;
        self
    }

    /// Load a session from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a session from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the session to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the session to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the whole session.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_session(self)
    }

    /// Playback layout.
    pub fn layout(&self) -> ChannelLayout {
        self.playback.layout
    }

    /// Build the routing table for this session.
    ///
    /// Outputs follow the playback layout, inputs the capture channel count.
    pub fn mapping(&self) -> Result<ChannelMapping, ConfigurationError> {
        let outputs = self.playback.layout.channel_count();
        let inputs = self.capture.channels;
        if self.mapping.routes.is_empty() {
            ChannelMapping::round_robin(outputs, inputs)
        } else {
            ChannelMapping::from_pairs(self.mapping.routes.iter().copied(), outputs, inputs)
        }
    }

    /// Target latency as a duration.
    pub fn target_latency(&self) -> Duration {
        ms_to_duration(self.target_latency_ms)
    }

    /// Ring capacity as a duration.
    pub fn max_buffer(&self) -> Duration {
        ms_to_duration(self.max_buffer_ms)
    }

    /// Frames of silence primed at start.
    pub fn target_frames(&self) -> usize {
        duration_to_frames(self.target_latency(), self.capture.sample_rate)
    }

    /// Ring capacity in frames.
    pub fn ring_frames(&self) -> usize {
        duration_to_frames(self.max_buffer(), self.capture.sample_rate).max(1)
    }
}

/// Milliseconds to a duration; negative and NaN become zero, overflow saturates.
fn ms_to_duration(ms: f32) -> Duration {
    Duration::try_from_secs_f64(f64::from(ms.max(0.0)) / 1000.0).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::ChannelSource;

    #[test]
    fn defaults() {
        let session = SessionConfig::new("In", "Out");
        assert_eq!(session.version, SESSION_VERSION);
        assert_eq!(session.capture.sample_rate, 48000);
        assert_eq!(session.capture.channels, 2);
        assert_eq!(session.layout(), ChannelLayout::Stereo);
        assert!(session.metering.enabled);
        assert!(session.mapping.routes.is_empty());
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let session = SessionConfig::from_toml(
            r#"
            [capture]
            device = "ASIO Interface"

            [playback]
            device = "Speakers"
            layout = "5.1"
            "#,
        )
        .unwrap();

        assert_eq!(session.target_latency_ms, 20.0);
        assert_eq!(session.max_buffer_ms, 250.0);
        assert_eq!(session.block_frames, 256);
        assert_eq!(session.layout(), ChannelLayout::FivePointOne);
        assert_eq!(session.metering.peak_release_ms, 300.0);

        // No routes: round-robin over the two capture channels.
        let mapping = session.mapping().unwrap();
        assert_eq!(mapping.outputs(), 6);
        assert_eq!(mapping.source(5), Some(ChannelSource::Input(1)));
    }

    #[test]
    fn explicit_routes_leave_rest_silent() {
        let session = SessionConfig::from_toml(
            r#"
            [capture]
            device = "ASIO Interface"
            channels = 2

            [playback]
            device = "Speakers"
            layout = "7.1"

            [mapping]
            routes = [[0, 0], [1, 1]]
            "#,
        )
        .unwrap();

        let mapping = session.mapping().unwrap();
        assert_eq!(mapping.outputs(), 8);
        assert_eq!(mapping.routes().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
        assert_eq!(mapping.source(2), Some(ChannelSource::Silence));
    }

    #[test]
    fn unknown_layout_is_a_parse_error() {
        let result = SessionConfig::from_toml(
            r#"
            [capture]
            device = "A"
            [playback]
            device = "B"
            layout = "9.2"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn toml_round_trip() {
        let session = SessionConfig::new("ASIO Interface", "Speakers")
            .with_layout(ChannelLayout::Quad)
            .with_routes([(0, 0), (1, 1), (2, 0)])
            .with_target_latency_ms(40.0)
            .with_metering(false);

        let text = session.to_toml().unwrap();
        assert!(text.contains("layout = \"quad\""), "got: {text}");
        let parsed = SessionConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn frame_conversions() {
        let session = SessionConfig::new("A", "B").with_sample_rate(48000);
        assert_eq!(session.target_frames(), 960);
        assert_eq!(session.ring_frames(), 12_000);
        assert_eq!(session.target_latency(), Duration::from_millis(20));
    }

    #[test]
    fn huge_buffer_saturates() {
        let session = SessionConfig::new("A", "B")
            .with_max_buffer_ms(1e25)
            .with_target_latency_ms(f32::INFINITY);
        assert_eq!(session.max_buffer(), Duration::MAX);
        assert_eq!(session.target_latency(), Duration::MAX);
        assert!(session.ring_frames() > 0);
        assert_eq!(
            SessionConfig::new("A", "B").with_max_buffer_ms(-5.0).max_buffer(),
            Duration::ZERO
        );
    }
}
