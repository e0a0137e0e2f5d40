//! Session validation.
//!
//! A [`SessionConfig`] is checked once, before any device is touched. All
//! problems are collected so a user editing a session file sees every mistake
//! in one pass.
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::{SessionConfig, ValidationError, validate_session};
//!
//! let session = SessionConfig::new("Interface", "Interface");
//! assert!(matches!(
//!     validate_session(&session),
//!     Err(ValidationError::SameDevice(_))
//! ));
//! ```

use patchbay_core::ConfigurationError;
use thiserror::Error;

use crate::session::{SESSION_VERSION, SessionConfig};

/// Sample rates probed against devices, lowest to highest.
///
/// Covers telephony through high-resolution rates, including the odd
/// legacy rates some interfaces still advertise.
pub const CANDIDATE_SAMPLE_RATES: &[u32] = &[
    8000, 11025, 16000, 22050, 32000, 37800, 44056, 44100, 47250, 48000, 50000, 50400, 64000,
    88200, 96000, 176400, 192000, 352800, 384000,
];

/// Lowest sample rate a session may request.
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate a session may request.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Largest ring a session may request, in milliseconds.
pub const MAX_BUFFER_MS: f32 = 10_000.0;

/// Most capture channels a session may request.
pub const MAX_CAPTURE_CHANNELS: usize = u16::MAX as usize;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Session file written by an incompatible version.
    #[error("unsupported session version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// Sample rate outside the supported range.
    #[error("sample rate {0} Hz outside 8000..=384000 Hz")]
    SampleRate(u32),

    /// Target latency or maximum buffer is unusable.
    #[error("target latency {target_ms} ms must be positive and below max buffer {max_ms} ms")]
    Latency {
        /// Requested cushion.
        target_ms: f32,
        /// Ring capacity as a duration.
        max_ms: f32,
    },

    /// Maximum buffer above [`MAX_BUFFER_MS`].
    #[error("max buffer {0} ms outside 0..=10000 ms")]
    MaxBuffer(f32),

    /// Zero block size.
    #[error("block_frames must be greater than zero")]
    BlockFrames,

    /// Capture channel count outside `1..=MAX_CAPTURE_CHANNELS`.
    #[error("capture channel count {0} outside 1..=65535")]
    Channels(usize),

    /// Device name left blank.
    #[error("{0} device name is empty")]
    EmptyDevice(&'static str),

    /// Capture and playback name the same device.
    #[error("capture and playback both use '{0}'; route between two different devices")]
    SameDevice(String),

    /// Meter time constants must be positive.
    #[error("meter {param} must be positive, got {value}")]
    Metering {
        /// Name of the setting.
        param: &'static str,
        /// Offending value.
        value: f32,
    },

    /// Routing table does not fit the channel counts.
    #[error(transparent)]
    Mapping(#[from] ConfigurationError),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Whether two device names refer to the same device.
///
/// Comparison ignores case and surrounding whitespace.
pub fn same_device(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Check a session for every known problem.
///
/// Returns the single error when there is one, or
/// [`ValidationError::Multiple`] when there are several.
pub fn validate_session(session: &SessionConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if session.version != SESSION_VERSION {
        errors.push(ValidationError::UnsupportedVersion {
            found: session.version,
            expected: SESSION_VERSION,
        });
    }

    let rate = session.capture.sample_rate;
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        errors.push(ValidationError::SampleRate(rate));
    }

    let (target, max) = (session.target_latency_ms, session.max_buffer_ms);
    if !(target.is_finite() && max.is_finite() && target > 0.0 && target < max) {
        errors.push(ValidationError::Latency {
            target_ms: target,
            max_ms: max,
        });
    }
    if max > MAX_BUFFER_MS {
        errors.push(ValidationError::MaxBuffer(max));
    }

    if session.block_frames == 0 {
        errors.push(ValidationError::BlockFrames);
    }
    let channels = session.capture.channels;
    if !(1..=MAX_CAPTURE_CHANNELS).contains(&channels) {
        errors.push(ValidationError::Channels(channels));
    }

    let capture = session.capture.device.trim();
    let playback = session.playback.device.trim();
    if capture.is_empty() {
        errors.push(ValidationError::EmptyDevice("capture"));
    }
    if playback.is_empty() {
        errors.push(ValidationError::EmptyDevice("playback"));
    }
    if !capture.is_empty() && same_device(capture, playback) {
        errors.push(ValidationError::SameDevice(capture.to_string()));
    }

    for (param, value) in [
        ("peak_release_ms", session.metering.peak_release_ms),
        ("rms_window_ms", session.metering.rms_window_ms),
    ] {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::Metering { param, value });
        }
    }

    if (1..=MAX_CAPTURE_CHANNELS).contains(&channels)
        && let Err(e) = session.mapping()
    {
        errors.push(e.into());
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
