//! Device bridge for patchbay.
//!
//! This crate connects the real-time primitives of `patchbay-core` to audio
//! hardware:
//!
//! - **Host abstraction**: [`AudioHost`] lists devices and opens streams by
//!   name; the bridge receives it by injection
//! - **cpal backend**: [`CpalHost`] wraps the platform host (or a named one
//!   such as ASIO)
//! - **Mock backend**: [`MockHost`] drives callbacks by hand for tests
//! - **Lifecycle**: [`Bridge`] owns one capture → playback session from
//!   construction to disposal
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use patchbay_config::SessionConfig;
//! use patchbay_core::ChannelLayout;
//! use patchbay_io::{Bridge, CpalHost};
//!
//! let session = SessionConfig::new("Focusrite USB ASIO", "Speakers")
//!     .with_layout(ChannelLayout::SevenPointOne)
//!     .with_routes([(0, 0), (1, 1)]);
//!
//! let mut bridge = Bridge::new(Arc::new(CpalHost::new()), session)?;
//! bridge.start()?;
//! println!("buffered: {:?}", bridge.buffered_duration()?);
//! bridge.dispose()?;
//! ```

pub mod bridge;
pub mod cpal_host;
pub mod host;
pub mod mock;

pub use bridge::{Bridge, BridgeState, BridgeStats, StreamFault};
pub use cpal_host::CpalHost;
pub use host::{
    AudioDevice, AudioHost, Direction, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
    StreamRequest, find_device_in, generic_channel_names, probe_sample_rates,
};
pub use mock::{MockDevice, MockHost};

use patchbay_config::ConfigError;
use patchbay_core::ConfigurationError;

/// Error types for bridge and device operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Routing or layout rejected before any device was touched.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Session file or validation error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A device was found but could not be opened.
    #[error("failed to open '{device}': {reason}")]
    DeviceOpen {
        /// Device name.
        device: String,
        /// Driver or host message.
        reason: String,
    },

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Capture and playback resolve to the same device.
    #[error("capture and playback resolve to the same device '{0}'")]
    SameDevice(String),

    /// Host enumeration or stream setup error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Fatal fault reported from a running stream.
    #[error("stream fault: {0}")]
    StreamFault(#[from] StreamFault),

    /// Operation not allowed in the current lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Attempted operation.
        operation: &'static str,
        /// State the bridge was in.
        state: BridgeState,
    },

    /// The bridge has been disposed.
    #[error("bridge has been disposed")]
    Disposed,

    /// The host does not implement the requested capability.
    #[error("not supported by this host: {0}")]
    Unsupported(String),
}

/// Convenience result type for bridge and device operations.
pub type Result<T> = std::result::Result<T, Error>;
