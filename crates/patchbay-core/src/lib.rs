//! Patchbay Core - real-time routing primitives
//!
//! This crate holds everything the capture and playback callbacks touch while
//! audio is flowing. Nothing here opens a device; `patchbay-io` wires these
//! pieces to real (or mock) hardware.
//!
//! # Components
//!
//! - [`ChannelLayout`] / [`ChannelRole`] - named speaker layouts and the
//!   canonical role order (L, R, C, LFE, BL, BR, SL, SR)
//! - [`ChannelMapping`] - validated output → input routing table with silence
//!   and fan-out
//! - [`FrameRing`] - lock-free SPSC ring of multichannel frames; drops the
//!   oldest frame on overrun, yields silence on underrun
//! - [`LevelMeter`] / [`MeterBank`] - per-channel peak and RMS metering with a
//!   lock-free handoff to a polling thread
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{ChannelLayout, ChannelMapping, FrameRing, LevelMeter, MeterBallistics, MeterBank};
//!
//! let layout = ChannelLayout::Stereo;
//! let mapping = ChannelMapping::round_robin(layout.channel_count(), 1).unwrap();
//! let ring = FrameRing::new(1024, mapping.inputs()).unwrap();
//! let bank = MeterBank::for_layout(layout);
//! let mut meter = LevelMeter::new(layout.channel_count(), 48000.0, MeterBallistics::default());
//!
//! // Capture side
//! ring.push(&[0.25]);
//!
//! // Playback side
//! let mut captured = [0.0; 1];
//! let mut played = [0.0; 2];
//! ring.pop(&mut captured);
//! mapping.remap_frame(&captured, &mut played);
//! meter.update(&played);
//! meter.publish(&bank);
//!
//! assert_eq!(played, [0.25, 0.25]);
//! assert_eq!(bank.snapshot().max_peak(), 0.25);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocation, locking or blocking after construction
//! - **No unsafe**: shared sample storage uses atomics
//! - **Validate once**: routing errors surface as [`ConfigurationError`] before
//!   any stream is opened

pub mod error;
pub mod layout;
pub mod mapping;
pub mod meter;
pub mod ring;

pub use error::ConfigurationError;
pub use layout::{ChannelLayout, ChannelRole};
pub use mapping::{ChannelMapping, ChannelSource};
pub use meter::{ChannelLevel, LevelMeter, MeterBallistics, MeterBank, MeterSnapshot, linear_to_db};
pub use ring::{FrameRing, PopOutcome, PushOutcome, duration_to_frames, frames_to_duration};
