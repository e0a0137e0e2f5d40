//! Per-channel loudness metering.
//!
//! Metering is split across threads:
//!
//! - [`LevelMeter`] holds the ballistics state and is owned by the playback
//!   callback. It consumes post-remap frames and, once per block, publishes
//!   the current values.
//! - [`MeterBank`] is the shared, lock-free publication point. Values are
//!   bit-cast `f32` in `AtomicU32` cells, so a reader sees the most recent
//!   completed write of each cell without ever blocking the writer.
//!
//! The bank also carries the metering gate. The playback callback checks it
//! once per block with a relaxed load; flipping it from another thread costs
//! at most one block of skipped or wasted metering work.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::layout::{ChannelLayout, ChannelRole};

/// Below this a level is treated as silence.
const LEVEL_FLOOR: f32 = 1e-10;

/// Time constants for peak and RMS detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterBallistics {
    /// Time for the held peak to fall by 1/e once the signal drops.
    pub peak_release_ms: f32,
    /// Length of the exponential RMS window.
    pub rms_window_ms: f32,
}

impl Default for MeterBallistics {
    fn default() -> Self {
        Self {
            peak_release_ms: 300.0,
            rms_window_ms: 50.0,
        }
    }
}

/// One-pole coefficient for a time constant of `ms` at `sample_rate`.
fn time_coeff(ms: f32, sample_rate: f32) -> f32 {
    let samples = (ms.max(0.01) * 0.001 * sample_rate).max(1.0);
    libm::expf(-1.0 / samples)
}

/// Convert a linear level to dBFS, clamped at -200 dB.
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * libm::log10f(linear.max(LEVEL_FLOOR))
}

/// Peak and RMS detector for a fixed set of channels.
///
/// All state is allocated in [`new`](Self::new); [`update`](Self::update),
/// [`update_block`](Self::update_block) and [`publish`](Self::publish) never
/// allocate.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    peak: Vec<f32>,
    mean_square: Vec<f32>,
    release_coeff: f32,
    rms_coeff: f32,
}

impl LevelMeter {
    /// Create a meter for `channels` channels at `sample_rate`.
    pub fn new(channels: usize, sample_rate: f32, ballistics: MeterBallistics) -> Self {
        Self {
            peak: vec![0.0; channels],
            mean_square: vec![0.0; channels],
            release_coeff: time_coeff(ballistics.peak_release_ms, sample_rate),
            rms_coeff: time_coeff(ballistics.rms_window_ms, sample_rate),
        }
    }

    /// Number of metered channels.
    pub fn channels(&self) -> usize {
        self.peak.len()
    }

    /// Feed one frame.
    #[inline]
    pub fn update(&mut self, frame: &[f32]) {
        for ((&x, peak), ms) in frame
            .iter()
            .zip(self.peak.iter_mut())
            .zip(self.mean_square.iter_mut())
        {
            let x = if x.is_finite() { x.abs() } else { 0.0 };

            // Instant attack, exponential release.
            *peak = if x >= *peak {
                x
            } else {
                let decayed = *peak * self.release_coeff;
                if decayed < LEVEL_FLOOR { 0.0 } else { decayed }
            };

            *ms = self.rms_coeff * *ms + (1.0 - self.rms_coeff) * x * x;
            if *ms < LEVEL_FLOOR * LEVEL_FLOOR {
                *ms = 0.0;
            }
        }
    }

    /// Feed every complete frame of an interleaved block.
    pub fn update_block(&mut self, interleaved: &[f32]) {
        let channels = self.channels().max(1);
        for frame in interleaved.chunks_exact(channels) {
            self.update(frame);
        }
    }

    /// Current peak of `channel` (linear).
    pub fn peak(&self, channel: usize) -> f32 {
        self.peak.get(channel).copied().unwrap_or(0.0)
    }

    /// Current RMS of `channel` (linear).
    pub fn rms(&self, channel: usize) -> f32 {
        self.mean_square
            .get(channel)
            .map(|&ms| libm::sqrtf(ms))
            .unwrap_or(0.0)
    }

    /// Store the current values into `bank`.
    pub fn publish(&self, bank: &MeterBank) {
        for channel in 0..self.channels() {
            bank.store(channel, self.peak(channel), self.rms(channel));
        }
    }

    /// Clear detector state.
    pub fn reset(&mut self) {
        self.peak.fill(0.0);
        self.mean_square.fill(0.0);
    }
}

/// Shared, lock-free meter values plus the metering gate.
#[derive(Debug)]
pub struct MeterBank {
    roles: Vec<Option<ChannelRole>>,
    peak: Box<[AtomicU32]>,
    rms: Box<[AtomicU32]>,
    enabled: AtomicBool,
}

impl MeterBank {
    /// Create a bank labelled with the roles of `layout`.
    pub fn for_layout(layout: ChannelLayout) -> Self {
        Self::with_roles(layout.roles().iter().copied().map(Some).collect())
    }

    /// Create a bank for `channels` unlabelled channels.
    pub fn unlabelled(channels: usize) -> Self {
        Self::with_roles(vec![None; channels])
    }

    fn with_roles(roles: Vec<Option<ChannelRole>>) -> Self {
        let cells = |n: usize| (0..n).map(|_| AtomicU32::new(0)).collect::<Box<[_]>>();
        Self {
            peak: cells(roles.len()),
            rms: cells(roles.len()),
            roles,
            enabled: AtomicBool::new(true),
        }
    }

    /// Number of channels in the bank.
    pub fn channels(&self) -> usize {
        self.roles.len()
    }

    /// Whether the playback callback should compute meters.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn metering on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    fn store(&self, channel: usize, peak: f32, rms: f32) {
        if let (Some(p), Some(r)) = (self.peak.get(channel), self.rms.get(channel)) {
            p.store(peak.to_bits(), Ordering::Relaxed);
            r.store(rms.to_bits(), Ordering::Relaxed);
        }
    }

    /// Zero every published value.
    pub fn reset(&self) {
        for cell in self.peak.iter().chain(self.rms.iter()) {
            cell.store(0, Ordering::Relaxed);
        }
    }

    /// Copy out the latest published values.
    pub fn snapshot(&self) -> MeterSnapshot {
        let levels = self
            .roles
            .iter()
            .enumerate()
            .map(|(channel, &role)| ChannelLevel {
                channel,
                role,
                peak: f32::from_bits(self.peak[channel].load(Ordering::Relaxed)),
                rms: f32::from_bits(self.rms[channel].load(Ordering::Relaxed)),
            })
            .collect();
        MeterSnapshot { levels }
    }
}

/// Level of one output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    /// Output channel index.
    pub channel: usize,
    /// Speaker role, when the layout names one.
    pub role: Option<ChannelRole>,
    /// Decaying peak (linear).
    pub peak: f32,
    /// Short-window RMS (linear).
    pub rms: f32,
}

impl ChannelLevel {
    /// Peak in dBFS.
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }

    /// RMS in dBFS.
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }
}

/// Point-in-time copy of a [`MeterBank`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    /// One entry per output channel, in channel order.
    pub levels: Vec<ChannelLevel>,
}

impl MeterSnapshot {
    /// Level of the first channel with the given role.
    pub fn get(&self, role: ChannelRole) -> Option<&ChannelLevel> {
        self.levels.iter().find(|l| l.role == Some(role))
    }

    /// Level of an output channel by index.
    pub fn channel(&self, channel: usize) -> Option<&ChannelLevel> {
        self.levels.get(channel)
    }

    /// Highest peak across all channels.
    pub fn max_peak(&self) -> f32 {
        self.levels.iter().map(|l| l.peak).fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn constant_signal_converges() {
        let mut meter = LevelMeter::new(2, SR, MeterBallistics::default());
        for _ in 0..SR as usize {
            meter.update(&[1.0, 0.0]);
        }
        assert_eq!(meter.peak(0), 1.0);
        assert!((meter.rms(0) - 1.0).abs() < 1e-3, "rms = {}", meter.rms(0));
        assert_eq!(meter.peak(1), 0.0);
        assert_eq!(meter.rms(1), 0.0);
    }

    #[test]
    fn peak_decays_after_signal_stops() {
        let mut meter = LevelMeter::new(1, SR, MeterBallistics::default());
        meter.update(&[0.8]);
        assert_eq!(meter.peak(0), 0.8);

        // One release time constant: falls to ~1/e.
        for _ in 0..(0.3 * SR) as usize {
            meter.update(&[0.0]);
        }
        let expected = 0.8 * core::f32::consts::E.recip();
        assert!((meter.peak(0) - expected).abs() < 0.01, "peak = {}", meter.peak(0));
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut meter = LevelMeter::new(1, SR, MeterBallistics::default());
        meter.update(&[f32::NAN]);
        meter.update(&[f32::INFINITY]);
        assert_eq!(meter.peak(0), 0.0);
        assert_eq!(meter.rms(0), 0.0);
    }

    #[test]
    fn publish_and_snapshot() {
        let bank = MeterBank::for_layout(ChannelLayout::Stereo);
        let mut meter = LevelMeter::new(2, SR, MeterBallistics::default());
        meter.update_block(&[0.5, 0.25, 0.5, 0.25]);
        meter.publish(&bank);

        let snap = bank.snapshot();
        assert_eq!(snap.levels.len(), 2);
        assert_eq!(snap.get(ChannelRole::Left).unwrap().peak, 0.5);
        assert_eq!(snap.get(ChannelRole::Right).unwrap().peak, 0.25);
        assert!(snap.get(ChannelRole::Center).is_none());
        assert_eq!(snap.max_peak(), 0.5);

        bank.reset();
        assert_eq!(bank.snapshot().max_peak(), 0.0);
    }

    #[test]
    fn gate_toggles() {
        let bank = MeterBank::unlabelled(3);
        assert!(bank.is_enabled());
        bank.set_enabled(false);
        assert!(!bank.is_enabled());
        assert_eq!(bank.snapshot().channel(2).unwrap().role, None);
    }

    #[test]
    fn db_conversion() {
        assert!((linear_to_db(1.0)).abs() < 1e-6);
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((linear_to_db(0.0) + 200.0).abs() < 1e-3);
    }
}
