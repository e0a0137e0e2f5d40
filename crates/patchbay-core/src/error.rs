//! Configuration errors raised while building routing tables.

use thiserror::Error;

/// Rejected routing configuration.
///
/// Raised only at construction time; nothing on the real-time path returns
/// this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The mapping has no output channels.
    #[error("channel mapping has no output channels")]
    NoOutputs,

    /// The capture side has no channels.
    #[error("capture channel count must be at least 1")]
    NoInputs,

    /// An output index was listed more than once.
    #[error("output channel {0} is mapped more than once")]
    DuplicateOutput(usize),

    /// An output index is outside `0..outputs`.
    #[error("output channel {index} out of range (playback has {outputs} channels)")]
    OutputOutOfRange {
        /// Offending output index.
        index: usize,
        /// Number of playback channels.
        outputs: usize,
    },

    /// An input index is outside `0..inputs`.
    #[error("output channel {output} reads input {input}, but capture has {inputs} channels")]
    InputOutOfRange {
        /// Output channel holding the bad route.
        output: usize,
        /// Offending input index.
        input: usize,
        /// Number of capture channels.
        inputs: usize,
    },

    /// Mapping and layout disagree on the playback channel count.
    #[error("layout {layout} has {expected} channels but the mapping has {actual}")]
    LayoutMismatch {
        /// Layout identifier.
        layout: &'static str,
        /// Channel count of the layout.
        expected: usize,
        /// Output count of the mapping.
        actual: usize,
    },

    /// Unrecognized layout name.
    #[error("unknown channel layout: {0}")]
    UnknownLayout(String),

    /// Ring buffer must hold at least one frame of at least one channel.
    #[error("ring buffer needs capacity >= 1 frame and >= 1 channel (got {frames} x {channels})")]
    EmptyRing {
        /// Requested capacity in frames.
        frames: usize,
        /// Requested channel count.
        channels: usize,
    },

    /// `frames * channels` samples do not fit in memory.
    #[error("ring buffer of {frames} frames x {channels} channels is too large")]
    RingTooLarge {
        /// Requested capacity in frames.
        frames: usize,
        /// Requested channel count.
        channels: usize,
    },
}
