//! Lock-free single-producer/single-consumer frame ring.
//!
//! [`FrameRing`] sits between two independently clocked device callbacks: the
//! capture callback pushes frames, the playback callback pops them. Neither
//! side ever waits on the other.
//!
//! ## Policies
//!
//! - **Overrun** (ring full on push): the oldest unread frame is dropped and
//!   [`overruns`](FrameRing::overruns) increments. Freshness wins over
//!   completeness.
//! - **Underrun** (ring empty on pop): the caller's frame is zero-filled and
//!   [`underruns`](FrameRing::underruns) increments. Playback never stalls.
//!
//! ## Memory layout
//!
//! Samples are stored as bit-cast `f32` in `AtomicU32` cells, `channels`
//! cells per slot, so no `unsafe` is needed for cross-thread sharing. The
//! write and read cursors are monotonically increasing frame counters; the
//! occupied length is `write - read`.
//!
//! The producer owns the write cursor. The read cursor is advanced by the
//! consumer on every pop and, on overrun only, by the producer evicting the
//! oldest frame. Both advance it with a compare-exchange, so a consumer that
//! raced an eviction notices the failed exchange and retries instead of
//! returning a frame that was being overwritten.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{FrameRing, PopOutcome};
//!
//! let ring = FrameRing::new(4, 2).unwrap();
//! ring.push(&[0.5, -0.5]);
//!
//! let mut frame = [0.0; 2];
//! assert_eq!(ring.pop(&mut frame), PopOutcome::Frame);
//! assert_eq!(frame, [0.5, -0.5]);
//!
//! // Empty ring yields silence
//! assert_eq!(ring.pop(&mut frame), PopOutcome::Underrun);
//! assert_eq!(frame, [0.0, 0.0]);
//! assert_eq!(ring.underruns(), 1);
//! ```

use core::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use core::time::Duration;

use crate::error::ConfigurationError;

/// Result of a [`FrameRing::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame stored without loss.
    Stored,
    /// Ring was full; the oldest frame was dropped to make room.
    Evicted,
}

/// Result of a [`FrameRing::pop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    /// A buffered frame was copied out.
    Frame,
    /// Ring was empty; the output was zero-filled.
    Underrun,
}

/// Fixed-capacity ring of interleaved multichannel frames.
///
/// Exactly one thread may call the producer methods ([`push`](Self::push),
/// [`push_block`](Self::push_block), [`prefill_silence`](Self::prefill_silence))
/// and exactly one thread the consumer methods ([`pop`](Self::pop),
/// [`pop_block`](Self::pop_block)). Observers such as
/// [`buffered_duration`](Self::buffered_duration) may be called from anywhere.
#[derive(Debug)]
pub struct FrameRing {
    slots: Box<[AtomicU32]>,
    capacity: usize,
    channels: usize,
    write: AtomicUsize,
    read: AtomicUsize,
    overruns: AtomicU64,
    underruns: AtomicU64,
}

impl FrameRing {
    /// Create a ring holding `capacity` frames of `channels` samples each.
    pub fn new(capacity: usize, channels: usize) -> Result<Self, ConfigurationError> {
        if capacity == 0 || channels == 0 {
            return Err(ConfigurationError::EmptyRing {
                frames: capacity,
                channels,
            });
        }
        let Some(len) = capacity.checked_mul(channels) else {
            return Err(ConfigurationError::RingTooLarge {
                frames: capacity,
                channels,
            });
        };
        let slots = (0..len)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect();
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity, channels, "frame ring allocated");
        Ok(Self {
            slots,
            capacity,
            channels,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            overruns: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        })
    }

    /// Create a ring large enough to hold `max` of audio at `sample_rate`.
    pub fn for_duration(
        max: Duration,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Self, ConfigurationError> {
        Self::new(duration_to_frames(max, sample_rate).max(1), channels)
    }

    /// Capacity in frames (N).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples per frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Push one frame (producer only).
    ///
    /// Missing trailing samples in a short `frame` are stored as zero; extra
    /// samples are ignored.
    #[inline]
    pub fn push(&self, frame: &[f32]) -> PushOutcome {
        self.push_with(|ch| frame.get(ch).copied().unwrap_or(0.0))
    }

    /// Push every complete frame of an interleaved block (producer only).
    ///
    /// Returns the number of frames evicted to make room.
    pub fn push_block(&self, interleaved: &[f32]) -> usize {
        interleaved
            .chunks_exact(self.channels)
            .filter(|frame| self.push(frame) == PushOutcome::Evicted)
            .count()
    }

    /// Push up to `frames` silent frames (producer only).
    ///
    /// Used to prime the ring with a latency cushion before playback starts.
    /// Never pushes more than the capacity, so priming alone cannot overrun.
    pub fn prefill_silence(&self, frames: usize) -> usize {
        let room = self.capacity - self.len();
        let frames = frames.min(room);
        for _ in 0..frames {
            self.push_with(|_| 0.0);
        }
        frames
    }

    fn push_with(&self, sample: impl Fn(usize) -> f32) -> PushOutcome {
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Acquire);
        let mut outcome = PushOutcome::Stored;

        if w.wrapping_sub(r) >= self.capacity {
            // Full: evict the oldest frame. A failed exchange means the
            // consumer just freed a slot itself.
            if self
                .read
                .compare_exchange(r, r.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                outcome = PushOutcome::Evicted;
            }
        }

        let base = (w % self.capacity) * self.channels;
        for (ch, cell) in self.slots[base..base + self.channels].iter().enumerate() {
            cell.store(sample(ch).to_bits(), Ordering::Relaxed);
        }
        self.write.store(w.wrapping_add(1), Ordering::Release);
        outcome
    }

    /// Pop one frame into `out` (consumer only).
    ///
    /// Writes `min(out.len(), channels)` samples. On underrun those samples
    /// are set to zero.
    #[inline]
    pub fn pop(&self, out: &mut [f32]) -> PopOutcome {
        let n = out.len().min(self.channels);
        loop {
            let r = self.read.load(Ordering::Acquire);
            let w = self.write.load(Ordering::Acquire);
            if r == w {
                out[..n].fill(0.0);
                self.underruns.fetch_add(1, Ordering::Relaxed);
                return PopOutcome::Underrun;
            }

            let base = (r % self.capacity) * self.channels;
            for (dst, cell) in out[..n].iter_mut().zip(&self.slots[base..base + n]) {
                *dst = f32::from_bits(cell.load(Ordering::Relaxed));
            }

            if self
                .read
                .compare_exchange(r, r.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return PopOutcome::Frame;
            }
            // The producer evicted frame `r` while we copied it; take the next one.
        }
    }

    /// Pop into every complete frame of an interleaved block (consumer only).
    ///
    /// Returns the number of frames that underran (were zero-filled).
    pub fn pop_block(&self, interleaved: &mut [f32]) -> usize {
        let mut underruns = 0;
        for frame in interleaved.chunks_exact_mut(self.channels) {
            if self.pop(frame) == PopOutcome::Underrun {
                underruns += 1;
            }
        }
        underruns
    }

    /// Frames currently buffered, clamped to `0..=capacity`.
    ///
    /// Safe to call from any thread; the value may be stale by the time it is
    /// used.
    pub fn len(&self) -> usize {
        // Read cursor first: the write cursor only grows, so `w >= r` holds.
        let r = self.read.load(Ordering::Acquire);
        let w = self.write.load(Ordering::Acquire);
        w.wrapping_sub(r).min(self.capacity)
    }

    /// Whether no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time-equivalent of the buffered frames at `sample_rate`.
    ///
    /// Bounded by `capacity × frame_period`.
    pub fn buffered_duration(&self, sample_rate: u32) -> Duration {
        frames_to_duration(self.len(), sample_rate)
    }

    /// Maximum duration the ring can hold at `sample_rate`.
    pub fn max_duration(&self, sample_rate: u32) -> Duration {
        frames_to_duration(self.capacity, sample_rate)
    }

    /// Frames dropped on overrun since creation.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Zero-filled pops since creation.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Duration of `frames` at `sample_rate`. Zero when the rate is zero.
pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}

/// Number of whole frames covering `duration` at `sample_rate`, rounded up.
pub fn duration_to_frames(duration: Duration, sample_rate: u32) -> usize {
    libm::ceil(duration.as_secs_f64() * f64::from(sample_rate)) as usize
}
