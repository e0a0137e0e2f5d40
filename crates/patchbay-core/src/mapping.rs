//! Output-to-input channel routing.
//!
//! A [`ChannelMapping`] is a dense table with one entry per playback channel.
//! Each entry names the capture channel feeding it, or [`ChannelSource::Silence`].
//! Several outputs may read the same input (fan-out); one output never reads
//! two inputs.
//!
//! The table is validated once and never mutated afterwards, so it can be
//! shared with the playback callback behind an `Arc` without synchronization.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{ChannelMapping, ChannelSource};
//!
//! let mapping = ChannelMapping::new(
//!     vec![ChannelSource::Input(2), ChannelSource::Silence, ChannelSource::Input(0)],
//!     3,
//! )
//! .unwrap();
//!
//! let mut out = [0.0; 3];
//! mapping.remap_frame(&[0.1, 0.2, 0.3], &mut out);
//! assert_eq!(out, [0.3, 0.0, 0.1]);
//! ```

use core::fmt;

use crate::error::ConfigurationError;
use crate::layout::ChannelLayout;

/// Where an output channel takes its signal from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    /// Zero-based capture channel index.
    Input(usize),
    /// Output is held at zero.
    Silence,
}

impl ChannelSource {
    /// The input index, or `None` for silence.
    pub fn input(self) -> Option<usize> {
        match self {
            ChannelSource::Input(i) => Some(i),
            ChannelSource::Silence => None,
        }
    }
}

impl fmt::Display for ChannelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSource::Input(i) => write!(f, "in{}", i),
            ChannelSource::Silence => f.write_str("silence"),
        }
    }
}

/// Validated routing table from playback channels to capture channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    sources: Vec<ChannelSource>,
    inputs: usize,
}

impl ChannelMapping {
    /// Build a mapping from one source per output channel.
    ///
    /// `inputs` is the capture channel count; every `Input(i)` must satisfy
    /// `i < inputs`.
    pub fn new(sources: Vec<ChannelSource>, inputs: usize) -> Result<Self, ConfigurationError> {
        if sources.is_empty() {
            return Err(ConfigurationError::NoOutputs);
        }
        if inputs == 0 {
            return Err(ConfigurationError::NoInputs);
        }
        for (output, source) in sources.iter().enumerate() {
            if let ChannelSource::Input(input) = *source
                && input >= inputs
            {
                return Err(ConfigurationError::InputOutOfRange {
                    output,
                    input,
                    inputs,
                });
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(outputs = sources.len(), inputs, "channel mapping built");
        Ok(Self { sources, inputs })
    }

    /// Build a mapping from `(output, input)` pairs.
    ///
    /// Outputs not named in `pairs` are silent. Listing the same output twice
    /// is rejected; listing the same input twice is fan-out and allowed.
    pub fn from_pairs<I>(pairs: I, outputs: usize, inputs: usize) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        if outputs == 0 {
            return Err(ConfigurationError::NoOutputs);
        }
        let mut sources = vec![None; outputs];
        for (output, input) in pairs {
            let slot = sources
                .get_mut(output)
                .ok_or(ConfigurationError::OutputOutOfRange { index: output, outputs })?;
            if slot.is_some() {
                return Err(ConfigurationError::DuplicateOutput(output));
            }
            *slot = Some(ChannelSource::Input(input));
        }
        let sources = sources
            .into_iter()
            .map(|s| s.unwrap_or(ChannelSource::Silence))
            .collect();
        Self::new(sources, inputs)
    }

    /// Default routing: output `i` reads input `i % inputs`.
    ///
    /// With fewer inputs than outputs the inputs repeat in order.
    pub fn round_robin(outputs: usize, inputs: usize) -> Result<Self, ConfigurationError> {
        if inputs == 0 {
            return Err(ConfigurationError::NoInputs);
        }
        let sources = (0..outputs).map(|o| ChannelSource::Input(o % inputs)).collect();
        Self::new(sources, inputs)
    }

    /// Identity routing for the first `min(outputs, inputs)` channels, silence for the rest.
    pub fn identity(outputs: usize, inputs: usize) -> Result<Self, ConfigurationError> {
        Self::from_pairs((0..outputs.min(inputs)).map(|c| (c, c)), outputs, inputs)
    }

    /// Check that this mapping fills exactly the channels of `layout`.
    pub fn check_layout(&self, layout: ChannelLayout) -> Result<(), ConfigurationError> {
        if self.outputs() == layout.channel_count() {
            Ok(())
        } else {
            Err(ConfigurationError::LayoutMismatch {
                layout: layout.as_str(),
                expected: layout.channel_count(),
                actual: self.outputs(),
            })
        }
    }

    /// Number of playback channels (K).
    pub fn outputs(&self) -> usize {
        self.sources.len()
    }

    /// Number of capture channels (M).
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Source of the given output channel.
    pub fn source(&self, output: usize) -> Option<ChannelSource> {
        self.sources.get(output).copied()
    }

    /// All sources in output order.
    pub fn sources(&self) -> &[ChannelSource] {
        &self.sources
    }

    /// Routed `(output, input)` pairs, skipping silent outputs.
    pub fn routes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(o, s)| s.input().map(|i| (o, i)))
    }

    /// Remap one frame.
    ///
    /// `input` holds at least [`inputs`](Self::inputs) samples and `output`
    /// at least [`outputs`](Self::outputs). Extra output samples are left
    /// untouched.
    #[inline]
    pub fn remap_frame(&self, input: &[f32], output: &mut [f32]) {
        for (out, source) in output.iter_mut().zip(&self.sources) {
            *out = match *source {
                ChannelSource::Input(i) => input.get(i).copied().unwrap_or(0.0),
                ChannelSource::Silence => 0.0,
            };
        }
    }

    /// Remap a block of interleaved frames.
    ///
    /// Processes `min(input.len() / inputs, output.len() / outputs)` frames and
    /// returns that count.
    pub fn remap_block(&self, input: &[f32], output: &mut [f32]) -> usize {
        let mut frames = 0;
        for (in_frame, out_frame) in input
            .chunks_exact(self.inputs)
            .zip(output.chunks_exact_mut(self.sources.len()))
        {
            self.remap_frame(in_frame, out_frame);
            frames += 1;
        }
        frames
    }
}

impl fmt::Display for ChannelMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (o, source) in self.sources.iter().enumerate() {
            if o > 0 {
                f.write_str(", ")?;
            }
            write!(f, "out{} <- {}", o, source)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_with_silence_and_reorder() {
        let mapping = ChannelMapping::new(
            vec![
                ChannelSource::Input(2),
                ChannelSource::Silence,
                ChannelSource::Input(0),
            ],
            3,
        )
        .unwrap();
        let mut out = [9.0; 3];
        mapping.remap_frame(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, [3.0, 0.0, 1.0]);
    }

    #[test]
    fn fan_out_is_allowed() {
        let mapping = ChannelMapping::from_pairs([(0, 0), (1, 0), (2, 0)], 3, 1).unwrap();
        let mut out = [0.0; 3];
        mapping.remap_frame(&[0.5], &mut out);
        assert_eq!(out, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn duplicate_output_rejected() {
        let err = ChannelMapping::from_pairs([(0, 0), (0, 1)], 2, 2).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateOutput(0));
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(
            ChannelMapping::from_pairs([(2, 0)], 2, 2).unwrap_err(),
            ConfigurationError::OutputOutOfRange { index: 2, outputs: 2 }
        );
        assert_eq!(
            ChannelMapping::from_pairs([(0, 5)], 2, 2).unwrap_err(),
            ConfigurationError::InputOutOfRange {
                output: 0,
                input: 5,
                inputs: 2
            }
        );
    }

    #[test]
    fn empty_tables_rejected() {
        assert_eq!(
            ChannelMapping::new(Vec::new(), 2).unwrap_err(),
            ConfigurationError::NoOutputs
        );
        assert_eq!(
            ChannelMapping::round_robin(2, 0).unwrap_err(),
            ConfigurationError::NoInputs
        );
    }

    #[test]
    fn unmapped_outputs_are_silent() {
        let mapping = ChannelMapping::from_pairs([(0, 0), (1, 1)], 8, 2).unwrap();
        assert_eq!(mapping.outputs(), 8);
        for o in 2..8 {
            assert_eq!(mapping.source(o), Some(ChannelSource::Silence));
        }
        assert_eq!(mapping.routes().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn round_robin_repeats_inputs() {
        let mapping = ChannelMapping::round_robin(6, 2).unwrap();
        let inputs: Vec<_> = mapping.sources().iter().map(|s| s.input().unwrap()).collect();
        assert_eq!(inputs, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn identity_pads_with_silence() {
        let mapping = ChannelMapping::identity(4, 2).unwrap();
        assert_eq!(
            mapping.sources(),
            &[
                ChannelSource::Input(0),
                ChannelSource::Input(1),
                ChannelSource::Silence,
                ChannelSource::Silence
            ]
        );
    }

    #[test]
    fn layout_check() {
        let mapping = ChannelMapping::identity(2, 2).unwrap();
        assert!(mapping.check_layout(ChannelLayout::Stereo).is_ok());
        assert!(matches!(
            mapping.check_layout(ChannelLayout::FivePointOne),
            Err(ConfigurationError::LayoutMismatch { expected: 6, actual: 2, .. })
        ));
    }

    #[test]
    fn remap_block_interleaved() {
        // 2 inputs -> 3 outputs: [in1, in0, silence]
        let mapping = ChannelMapping::new(
            vec![
                ChannelSource::Input(1),
                ChannelSource::Input(0),
                ChannelSource::Silence,
            ],
            2,
        )
        .unwrap();
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut output = [7.0; 6];
        assert_eq!(mapping.remap_block(&input, &mut output), 2);
        assert_eq!(output, [2.0, 1.0, 0.0, 4.0, 3.0, 0.0]);
    }

    #[test]
    fn display_lists_routes() {
        let mapping = ChannelMapping::from_pairs([(0, 1)], 2, 2).unwrap();
        assert_eq!(mapping.to_string(), "out0 <- in1, out1 <- silence");
    }
}
