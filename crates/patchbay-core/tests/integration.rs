//! Integration tests for patchbay-core.
//!
//! Exercises the full real-time path without devices: capture frames go into
//! a [`FrameRing`], come out on the playback side, are remapped through a
//! [`ChannelMapping`] and metered into a [`MeterBank`].

use std::time::Duration;

use patchbay_core::{
    ChannelLayout, ChannelMapping, ChannelRole, ChannelSource, FrameRing, LevelMeter,
    MeterBallistics, MeterBank, duration_to_frames,
};

const SR: u32 = 48_000;
const TAU: f32 = core::f32::consts::TAU;

/// Interleaved stereo sine: left at `freq`, right silent.
fn stereo_sine_left(freq: f32, frames: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .flat_map(|n| {
            let s = amplitude * libm::sinf(TAU * freq * n as f32 / SR as f32);
            [s, 0.0]
        })
        .collect()
}

/// Drives capture and playback in lockstep blocks, as two devices sharing a
/// clock would.
struct Path {
    ring: FrameRing,
    mapping: ChannelMapping,
    meter: LevelMeter,
    bank: MeterBank,
    captured: Vec<f32>,
}

impl Path {
    fn new(layout: ChannelLayout, mapping: ChannelMapping, block: usize) -> Self {
        let ring = FrameRing::for_duration(Duration::from_millis(250), SR, mapping.inputs()).unwrap();
        Self {
            captured: vec![0.0; block * mapping.inputs()],
            meter: LevelMeter::new(layout.channel_count(), SR as f32, MeterBallistics::default()),
            bank: MeterBank::for_layout(layout),
            ring,
            mapping,
        }
    }

    fn capture(&self, block: &[f32]) {
        self.ring.push_block(block);
    }

    fn playback(&mut self, out: &mut [f32]) {
        self.ring.pop_block(&mut self.captured);
        self.mapping.remap_block(&self.captured, out);
        if self.bank.is_enabled() {
            self.meter.update_block(out);
            self.meter.publish(&self.bank);
        }
    }
}

// ============================================================================
// 1. Stereo into 7.1
// ============================================================================

#[test]
fn stereo_to_surround_routes_and_meters() {
    let layout = ChannelLayout::SevenPointOne;
    let mapping = ChannelMapping::from_pairs([(0, 0), (1, 1)], 8, 2).unwrap();
    let block = 256;
    let mut path = Path::new(layout, mapping, block);

    let target = duration_to_frames(Duration::from_millis(20), SR);
    path.ring.prefill_silence(target);

    let signal = stereo_sine_left(1000.0, SR as usize, 0.5);
    let mut out = vec![0.0; block * 8];
    for chunk in signal.chunks_exact(block * 2) {
        path.capture(chunk);
        path.playback(&mut out);
        assert_eq!(path.ring.len(), target, "buffer level drifted");
    }

    assert_eq!(path.ring.overruns(), 0);
    assert_eq!(path.ring.underruns(), 0);

    let snap = path.bank.snapshot();
    let left = snap.get(ChannelRole::Left).unwrap();
    assert!(left.peak > 0.45 && left.peak <= 0.5, "left peak = {}", left.peak);
    // Sine RMS is amplitude / sqrt(2)
    assert!((left.rms - 0.5 / 2f32.sqrt()).abs() < 0.02, "left rms = {}", left.rms);
    for role in &ChannelRole::ALL[1..] {
        assert_eq!(snap.get(*role).unwrap().peak, 0.0, "{} should be silent", role);
    }
}

#[test]
fn latency_cushion_delays_signal() {
    let layout = ChannelLayout::Mono;
    let mapping = ChannelMapping::round_robin(1, 1).unwrap();
    let mut path = Path::new(layout, mapping, 16);
    path.ring.prefill_silence(32);

    let impulse: Vec<f32> = (0..16).map(|n| if n == 0 { 1.0 } else { 0.0 }).collect();
    let silence = vec![0.0; 16];
    let mut out = vec![0.0; 16];
    let mut played = Vec::new();

    path.capture(&impulse);
    for _ in 0..4 {
        path.playback(&mut out);
        played.extend_from_slice(&out);
        path.capture(&silence);
    }

    let pos = played.iter().position(|&s| s == 1.0).unwrap();
    assert_eq!(pos, 32, "impulse should be delayed by the cushion");
}

// ============================================================================
// 2. Clock drift
// ============================================================================

#[test]
fn fast_capture_overruns_but_stays_bounded() {
    let mapping = ChannelMapping::identity(2, 2).unwrap();
    let ring = FrameRing::new(512, 2).unwrap();
    let mut captured = vec![0.0; 128 * 2];
    let mut out = vec![0.0; 128 * 2];

    // Capture delivers 129 frames for every 128 played.
    let block: Vec<f32> = vec![0.1; 129 * 2];
    for _ in 0..2000 {
        ring.push_block(&block);
        ring.pop_block(&mut captured);
        mapping.remap_block(&captured, &mut out);
        assert!(ring.buffered_duration(SR) <= ring.max_duration(SR));
    }
    assert!(ring.overruns() > 0);
    assert_eq!(ring.underruns(), 0);
    // Full after every push, one block drained after every pop.
    assert_eq!(ring.len(), ring.capacity() - 128);
}

#[test]
fn slow_capture_underruns_with_silence() {
    let mapping = ChannelMapping::identity(2, 2).unwrap();
    let ring = FrameRing::new(512, 2).unwrap();
    let mut captured = vec![0.0; 128 * 2];
    let mut out = vec![0.0; 128 * 2];

    let block: Vec<f32> = vec![0.1; 127 * 2];
    let mut zeros = 0usize;
    for _ in 0..600 {
        ring.push_block(&block);
        ring.pop_block(&mut captured);
        mapping.remap_block(&captured, &mut out);
        zeros += out.chunks_exact(2).filter(|f| f[0] == 0.0).count();
    }
    assert!(ring.underruns() > 0);
    assert_eq!(zeros as u64, ring.underruns());
    assert_eq!(ring.overruns(), 0);
}

// ============================================================================
// 3. Metering gate
// ============================================================================

#[test]
fn disabled_meters_stop_updating() {
    let layout = ChannelLayout::Stereo;
    let mapping = ChannelMapping::round_robin(2, 1).unwrap();
    let mut path = Path::new(layout, mapping, 64);
    let mut out = vec![0.0; 128];

    path.capture(&[0.5; 64]);
    path.playback(&mut out);
    assert_eq!(path.bank.snapshot().max_peak(), 0.5);

    path.bank.set_enabled(false);
    path.bank.reset();
    path.capture(&[0.9; 64]);
    path.playback(&mut out);
    assert_eq!(out[0], 0.9);
    assert_eq!(path.bank.snapshot().max_peak(), 0.0);
}

#[test]
fn surround_layout_from_name() {
    let layout: ChannelLayout = "5.1".parse().unwrap();
    let mapping = ChannelMapping::round_robin(layout.channel_count(), 2).unwrap();
    mapping.check_layout(layout).unwrap();
    assert_eq!(layout.role(3), Some(ChannelRole::Sub));
    assert_eq!(mapping.source(3), Some(ChannelSource::Input(1)));
}
