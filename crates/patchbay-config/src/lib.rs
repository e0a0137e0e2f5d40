//! Session configuration for patchbay.
//!
//! A session names a capture device, a playback device, the playback speaker
//! layout, the channel routing between them and the buffering policy. It is a
//! plain versioned struct, loaded from TOML and validated once before the
//! bridge touches any device.
//!
//! # Features
//!
//! - **Sessions**: Load and save [`SessionConfig`] as TOML
//! - **Validation**: Collect every problem in one [`ValidationError`]
//! - **Paths**: Platform-specific config and session directories
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::SessionConfig;
//! use patchbay_core::ChannelLayout;
//!
//! let session = SessionConfig::new("Focusrite USB ASIO", "Speakers")
//!     .with_layout(ChannelLayout::SevenPointOne)
//!     .with_routes([(0, 0), (1, 1)])
//!     .with_target_latency_ms(30.0);
//!
//! session.validate().unwrap();
//! let mapping = session.mapping().unwrap();
//! assert_eq!(mapping.outputs(), 8);
//! ```

mod error;
mod session;

/// Platform-specific paths for session files.
pub mod paths;

/// Session validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{
    default_session_path, ensure_user_config_dir, ensure_user_sessions_dir, find_session,
    list_user_sessions, user_config_dir, user_sessions_dir,
};
pub use session::{
    CaptureConfig, MappingConfig, MeteringConfig, PlaybackConfig, SESSION_VERSION, SessionConfig,
};
pub use validation::{
    CANDIDATE_SAMPLE_RATES, MAX_BUFFER_MS, MAX_CAPTURE_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
    ValidationError, ValidationResult, same_device, validate_session,
};
