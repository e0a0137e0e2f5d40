//! Capture → playback lifecycle controller.
//!
//! A [`Bridge`] owns one session: the routing table, the frame ring between
//! the two device clocks, the shared meter bank, and (while started) both
//! stream handles.
//!
//! ```text
//!  capture thread            playback thread              poller
//!  ──────────────            ───────────────              ──────
//!  push_block ──► FrameRing ──► pop ─► remap ─► device
//!                     │                  │
//!                     │                  └─► LevelMeter ─► MeterBank
//!                     ▼                                       ▼
//!              buffered_duration() ◄───────────────── snapshot()
//! ```
//!
//! The callbacks share only atomics with the control thread: a `running`
//! flag, the ring cursors, the meter cells and a one-shot fault code. They
//! never lock, log or allocate; scratch frames are sized at
//! [`start`](Bridge::start). Faults are logged by the poller.
//!
//! # Lifecycle
//!
//! `Created → Started → Stopped → Disposed`. A bridge runs at most once;
//! build a new one to run again. A fatal [`StreamFault`] reported by a
//! callback clears the running flag immediately and is surfaced by
//! [`poll_fault`](Bridge::poll_fault), which also stops the bridge.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use patchbay_config::{ConfigError, SessionConfig, same_device};
use patchbay_core::{
    ChannelLayout, ChannelMapping, FrameRing, LevelMeter, MeterBank, MeterSnapshot,
};

use crate::host::{
    AudioHost, Direction, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
    StreamRequest,
};
use crate::{Error, Result};

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeState {
    /// Configured; no stream open.
    Created,
    /// Both streams open and running.
    Started,
    /// Streams closed; configuration retained.
    Stopped,
    /// Resources released. Terminal.
    Disposed,
}

impl BridgeState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeState::Created => "created",
            BridgeState::Started => "started",
            BridgeState::Stopped => "stopped",
            BridgeState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal error raised inside a stream callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamFault {
    /// The device delivered a buffer that is not a whole number of frames.
    #[error("{direction} buffer of {len} samples is not a multiple of {channels} channels")]
    FormatMismatch {
        /// Side that delivered the buffer.
        direction: Direction,
        /// Buffer length in samples.
        len: usize,
        /// Expected channels per frame.
        channels: usize,
    },

    /// The driver reported an error on a running stream.
    #[error("{direction} device error: {message}")]
    Device {
        /// Side that reported the error.
        direction: Direction,
        /// Driver message.
        message: String,
    },
}

/// Counters for a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames dropped because capture outran playback.
    pub overruns: u64,
    /// Frames of silence played because the ring was empty.
    pub underruns: u64,
    /// Driver-reported stream errors.
    pub stream_errors: u64,
    /// Audio currently queued between the devices.
    pub buffered: Duration,
    /// Ring capacity as a duration.
    pub max_buffered: Duration,
    /// Lifecycle state.
    pub state: BridgeState,
}

/// Kind of the first recorded fault, stored as a `u8` (0 = none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FaultCode {
    CaptureFormat = 1,
    PlaybackFormat = 2,
    CaptureDevice = 3,
    PlaybackDevice = 4,
}

impl FaultCode {
    fn format(direction: Direction) -> Self {
        match direction {
            Direction::Capture => FaultCode::CaptureFormat,
            Direction::Playback => FaultCode::PlaybackFormat,
        }
    }

    fn device(direction: Direction) -> Self {
        match direction {
            Direction::Capture => FaultCode::CaptureDevice,
            Direction::Playback => FaultCode::PlaybackDevice,
        }
    }

    fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(FaultCode::CaptureFormat),
            2 => Some(FaultCode::PlaybackFormat),
            3 => Some(FaultCode::CaptureDevice),
            4 => Some(FaultCode::PlaybackDevice),
            _ => None,
        }
    }

    fn direction(self) -> Direction {
        match self {
            FaultCode::CaptureFormat | FaultCode::CaptureDevice => Direction::Capture,
            FaultCode::PlaybackFormat | FaultCode::PlaybackDevice => Direction::Playback,
        }
    }
}

/// State shared with the stream callbacks.
struct Shared {
    ring: FrameRing,
    meters: MeterBank,
    running: AtomicBool,
    faulted: AtomicBool,
    fault_code: AtomicU8,
    fault_len: AtomicUsize,
    /// Driver message; written only from the error callback.
    fault_message: OnceLock<String>,
    stream_errors: AtomicU64,
}

impl Shared {
    #[inline]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Halt both callbacks and keep the first fault.
    ///
    /// Wait-free and allocation-free when `message` is `None`.
    fn record_fault(&self, code: FaultCode, len: usize, message: Option<&str>) {
        self.running.store(false, Ordering::Release);
        if !self.faulted.swap(true, Ordering::AcqRel) {
            if let Some(message) = message {
                let _ = self.fault_message.set(message.to_string());
            }
            self.fault_len.store(len, Ordering::Relaxed);
            self.fault_code.store(code as u8, Ordering::Release);
        }
    }

    fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Rebuild the recorded fault. `None` until the recording thread has
    /// published its code.
    fn fault(&self, inputs: usize, outputs: usize) -> Option<StreamFault> {
        let code = FaultCode::from_u8(self.fault_code.load(Ordering::Acquire))?;
        let direction = code.direction();
        Some(match code {
            FaultCode::CaptureFormat | FaultCode::PlaybackFormat => StreamFault::FormatMismatch {
                direction,
                len: self.fault_len.load(Ordering::Relaxed),
                channels: match direction {
                    Direction::Capture => inputs,
                    Direction::Playback => outputs,
                },
            },
            FaultCode::CaptureDevice | FaultCode::PlaybackDevice => StreamFault::Device {
                direction,
                message: self.fault_message.get().cloned().unwrap_or_default(),
            },
        })
    }
}

/// Capture callback body: one device buffer into the ring.
struct CaptureProcessor {
    shared: Arc<Shared>,
    channels: usize,
}

impl CaptureProcessor {
    fn process(&mut self, data: &[f32]) {
        if !self.shared.is_running() {
            return;
        }
        if data.len() % self.channels != 0 {
            self.shared
                .record_fault(FaultCode::format(Direction::Capture), data.len(), None);
            return;
        }
        self.shared.ring.push_block(data);
    }
}

/// Playback callback body: ring → remap → device buffer, metering on the way.
struct PlaybackProcessor {
    shared: Arc<Shared>,
    mapping: Arc<ChannelMapping>,
    meter: LevelMeter,
    scratch: Vec<f32>,
    channels: usize,
}

impl PlaybackProcessor {
    fn process(&mut self, out: &mut [f32]) {
        if !self.shared.is_running() {
            out.fill(0.0);
            return;
        }
        if out.len() % self.channels != 0 {
            self.shared
                .record_fault(FaultCode::format(Direction::Playback), out.len(), None);
            out.fill(0.0);
            return;
        }

        let metering = self.shared.meters.is_enabled();
        for frame in out.chunks_exact_mut(self.channels) {
            self.shared.ring.pop(&mut self.scratch);
            self.mapping.remap_frame(&self.scratch, frame);
            if metering {
                self.meter.update(frame);
            }
        }
        if metering {
            self.meter.publish(&self.shared.meters);
        }
    }
}

/// Real-time bridge between one capture device and one playback device.
pub struct Bridge {
    host: Option<Arc<dyn AudioHost>>,
    session: SessionConfig,
    mapping: Arc<ChannelMapping>,
    capture_device: String,
    playback_device: String,
    shared: Arc<Shared>,
    capture: Option<StreamHandle>,
    playback: Option<StreamHandle>,
    state: BridgeState,
    started: bool,
    fault_reported: bool,
}

impl Bridge {
    /// Configure a bridge. Opens nothing.
    ///
    /// Validates `session`, builds the routing table, and resolves both
    /// device names through `host`.
    ///
    /// # Errors
    ///
    /// - [`Error::SameDevice`] when capture and playback name (or resolve
    ///   to) the same device
    /// - [`Error::Configuration`] for an invalid mapping
    /// - [`Error::Config`] when the session fails validation
    /// - [`Error::DeviceNotFound`] when a device name does not resolve
    pub fn new(host: Arc<dyn AudioHost>, session: SessionConfig) -> Result<Self> {
        if same_device(&session.capture.device, &session.playback.device) {
            return Err(Error::SameDevice(session.capture.device.trim().to_string()));
        }
        let layout = session.layout();
        let mapping = session.mapping()?;
        mapping.check_layout(layout)?;
        session.validate().map_err(ConfigError::from)?;

        let capture = host.find_device(&session.capture.device, Direction::Capture)?;
        let playback = host.find_device(&session.playback.device, Direction::Playback)?;
        if capture.name == playback.name {
            return Err(Error::SameDevice(capture.name));
        }

        let ring = FrameRing::new(session.ring_frames(), mapping.inputs())?;
        let meters = MeterBank::for_layout(layout);
        meters.set_enabled(session.metering.enabled);

        tracing::debug!(
            host = host.name(),
            capture = %capture.name,
            playback = %playback.name,
            mapping = %mapping,
            "bridge configured"
        );

        Ok(Self {
            host: Some(host),
            mapping: Arc::new(mapping),
            capture_device: capture.name,
            playback_device: playback.name,
            shared: Arc::new(Shared {
                ring,
                meters,
                running: AtomicBool::new(false),
                faulted: AtomicBool::new(false),
                fault_code: AtomicU8::new(0),
                fault_len: AtomicUsize::new(0),
                fault_message: OnceLock::new(),
                stream_errors: AtomicU64::new(0),
            }),
            session,
            capture: None,
            playback: None,
            state: BridgeState::Created,
            started: false,
            fault_reported: false,
        })
    }

    /// Open both streams and start moving audio.
    ///
    /// The ring is primed with the session's target latency of silence
    /// before either callback does any work.
    ///
    /// # Errors
    ///
    /// Any host error opening a stream. The bridge then stays
    /// [`BridgeState::Created`] with [`valid`](Self::valid) `false`, and
    /// nothing is left open.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state("start", BridgeState::Created)?;
        let host = self.host()?;

        let sample_rate = self.session.capture.sample_rate;
        let buffer_frames = self.session.block_frames;
        let inputs = self.mapping.inputs();
        let outputs = self.mapping.outputs();

        let playback_request = StreamRequest {
            device: self.playback_device.clone(),
            sample_rate,
            channels: channel_count(outputs)?,
            buffer_frames,
        };
        let capture_request = StreamRequest {
            device: self.capture_device.clone(),
            sample_rate,
            channels: channel_count(inputs)?,
            buffer_frames,
        };

        let opened = host
            .build_output_stream(
                &playback_request,
                self.playback_callback(sample_rate),
                self.error_callback(Direction::Playback),
            )
            .and_then(|playback| {
                host.build_input_stream(
                    &capture_request,
                    self.capture_callback(),
                    self.error_callback(Direction::Capture),
                )
                .map(|capture| (capture, playback))
            });
        let (capture, playback) = match opened {
            Ok(handles) => handles,
            Err(e) => {
                tracing::warn!(error = %e, "bridge failed to start");
                return Err(e);
            }
        };

        let primed = self.shared.ring.prefill_silence(self.session.target_frames());
        self.capture = Some(capture);
        self.playback = Some(playback);
        self.shared.running.store(true, Ordering::Release);
        self.state = BridgeState::Started;
        self.started = true;

        tracing::info!(
            capture = %self.capture_device,
            playback = %self.playback_device,
            sample_rate,
            inputs,
            outputs,
            layout = %self.layout(),
            primed_frames = primed,
            "bridge started"
        );
        Ok(())
    }

    /// Stop both streams. Idempotent once stopped; there is no restart.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Started => {
                self.halt();
                tracing::info!(
                    overruns = self.shared.ring.overruns(),
                    underruns = self.shared.ring.underruns(),
                    "bridge stopped"
                );
                Ok(())
            }
            BridgeState::Stopped => Ok(()),
            BridgeState::Disposed => Err(Error::Disposed),
            state => Err(Error::InvalidState {
                operation: "stop",
                state,
            }),
        }
    }

    /// Stop if running and release the host. Every later call fails with
    /// [`Error::Disposed`].
    pub fn dispose(&mut self) -> Result<()> {
        if self.state == BridgeState::Disposed {
            return Err(Error::Disposed);
        }
        self.release();
        tracing::debug!("bridge disposed");
        Ok(())
    }

    /// Whether [`start`](Self::start) succeeded and no fatal fault has been
    /// seen since.
    pub fn valid(&self) -> bool {
        self.started && !self.shared.is_faulted() && self.state != BridgeState::Disposed
    }

    /// Current lifecycle state.
    ///
    /// A started bridge reports [`BridgeState::Stopped`] as soon as a
    /// callback records a fatal fault, before [`poll_fault`](Self::poll_fault)
    /// closes the streams.
    pub fn state(&self) -> BridgeState {
        if self.state == BridgeState::Started && self.shared.is_faulted() {
            BridgeState::Stopped
        } else {
            self.state
        }
    }

    /// Audio queued between capture and playback.
    pub fn buffered_duration(&self) -> Result<Duration> {
        self.ensure_live()?;
        Ok(self.shared.ring.buffered_duration(self.session.capture.sample_rate))
    }

    /// Latest published meter values, one per output channel.
    pub fn snapshot(&self) -> Result<MeterSnapshot> {
        self.ensure_live()?;
        Ok(self.shared.meters.snapshot())
    }

    /// Counters and buffer depth.
    pub fn stats(&self) -> Result<BridgeStats> {
        self.ensure_live()?;
        let sample_rate = self.session.capture.sample_rate;
        Ok(BridgeStats {
            overruns: self.shared.ring.overruns(),
            underruns: self.shared.ring.underruns(),
            stream_errors: self.shared.stream_errors.load(Ordering::Relaxed),
            buffered: self.shared.ring.buffered_duration(sample_rate),
            max_buffered: self.shared.ring.max_duration(sample_rate),
            state: self.state(),
        })
    }

    /// Turn meter computation in the playback callback on or off.
    pub fn set_metering(&self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        self.shared.meters.set_enabled(enabled);
        Ok(())
    }

    /// Whether meters are being computed.
    pub fn metering_enabled(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.shared.meters.is_enabled())
    }

    /// Surface a fatal fault raised by a callback.
    ///
    /// The first call after a fault stops the bridge and returns
    /// [`Error::StreamFault`]; later calls return `Ok(())`.
    pub fn poll_fault(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.fault_reported {
            return Ok(());
        }
        let Some(fault) = self.fault() else {
            return Ok(());
        };
        self.fault_reported = true;
        tracing::error!(%fault, "stream fault, bridge halted");
        if self.state == BridgeState::Started {
            self.halt();
        }
        Err(fault.into())
    }

    /// The fault that halted the bridge, if any.
    pub fn fault(&self) -> Option<StreamFault> {
        self.shared
            .fault(self.mapping.inputs(), self.mapping.outputs())
    }

    /// Open the vendor configuration panel for `device`.
    pub fn show_control_panel(&self, device: &str) -> Result<()> {
        self.host()?.show_control_panel(device)
    }

    /// Session this bridge was built from.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Routing table.
    pub fn mapping(&self) -> &ChannelMapping {
        &self.mapping
    }

    /// Playback layout.
    pub fn layout(&self) -> ChannelLayout {
        self.session.layout()
    }

    /// Session sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.session.capture.sample_rate
    }

    /// Resolved capture device name.
    pub fn capture_device(&self) -> &str {
        &self.capture_device
    }

    /// Resolved playback device name.
    pub fn playback_device(&self) -> &str {
        &self.playback_device
    }

    fn host(&self) -> Result<Arc<dyn AudioHost>> {
        self.host.as_ref().map(Arc::clone).ok_or(Error::Disposed)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state == BridgeState::Disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn expect_state(&self, operation: &'static str, expected: BridgeState) -> Result<()> {
        match self.state {
            state if state == expected => Ok(()),
            BridgeState::Disposed => Err(Error::Disposed),
            state => Err(Error::InvalidState { operation, state }),
        }
    }

    /// Silence the callbacks, then close capture before playback.
    fn halt(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        drop(self.capture.take());
        drop(self.playback.take());
        self.shared.meters.reset();
        self.state = BridgeState::Stopped;
    }

    fn release(&mut self) {
        if self.state == BridgeState::Started {
            self.halt();
        }
        self.host = None;
        self.state = BridgeState::Disposed;
    }

    fn capture_callback(&self) -> InputCallback {
        let mut processor = CaptureProcessor {
            shared: Arc::clone(&self.shared),
            channels: self.mapping.inputs(),
        };
        Box::new(move |data| processor.process(data))
    }

    fn playback_callback(&self, sample_rate: u32) -> OutputCallback {
        let outputs = self.mapping.outputs();
        let mut processor = PlaybackProcessor {
            shared: Arc::clone(&self.shared),
            mapping: Arc::clone(&self.mapping),
            meter: LevelMeter::new(
                outputs,
                sample_rate as f32,
                self.session.metering.ballistics(),
            ),
            scratch: vec![0.0; self.mapping.inputs()],
            channels: outputs,
        };
        Box::new(move |out| processor.process(out))
    }

    fn error_callback(&self, direction: Direction) -> ErrorCallback {
        let shared = Arc::clone(&self.shared);
        Box::new(move |message| {
            shared.stream_errors.fetch_add(1, Ordering::Relaxed);
            shared.record_fault(FaultCode::device(direction), 0, Some(message));
        })
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.state != BridgeState::Disposed {
            self.release();
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state)
            .field("capture", &self.capture_device)
            .field("playback", &self.playback_device)
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

fn channel_count(channels: usize) -> Result<u16> {
    u16::try_from(channels).map_err(|_| Error::Unsupported(format!("{} channels", channels)))
}
