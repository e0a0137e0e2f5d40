//! Deterministic host for tests.
//!
//! [`MockHost`] never touches hardware. Opening a stream registers its
//! callbacks in the host; the test then plays the role of the device driver
//! by calling [`drive_capture`](MockHost::drive_capture),
//! [`drive_playback`](MockHost::drive_playback) and
//! [`fire_error`](MockHost::fire_error). Dropping the returned
//! [`StreamHandle`] unregisters the callbacks, after which driving that
//! direction is a no-op that returns `false`.
//!
//! Each direction holds at most one open stream, like an exclusive-mode
//! driver.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::host::{
    AudioDevice, AudioHost, Direction, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
    StreamRequest, generic_channel_names,
};
use crate::{Error, Result};

/// A simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    /// Device name.
    pub name: String,
    /// Capture channels.
    pub inputs: u16,
    /// Playback channels.
    pub outputs: u16,
    /// Accepted sample rates.
    pub sample_rates: Vec<u32>,
}

impl MockDevice {
    /// Capture-only device at 44.1/48/96 kHz.
    pub fn input(name: impl Into<String>, channels: u16) -> Self {
        Self::duplex(name, channels, 0)
    }

    /// Playback-only device at 44.1/48/96 kHz.
    pub fn output(name: impl Into<String>, channels: u16) -> Self {
        Self::duplex(name, 0, channels)
    }

    /// Device with both directions at 44.1/48/96 kHz.
    pub fn duplex(name: impl Into<String>, inputs: u16, outputs: u16) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            sample_rates: vec![44100, 48000, 96000],
        }
    }

    /// Replace the accepted sample rates.
    pub fn with_sample_rates(mut self, rates: impl IntoIterator<Item = u32>) -> Self {
        self.sample_rates = rates.into_iter().collect();
        self.sample_rates.sort_unstable();
        self
    }

    fn info(&self) -> AudioDevice {
        AudioDevice {
            name: self.name.clone(),
            is_input: self.inputs > 0,
            is_output: self.outputs > 0,
            input_channels: self.inputs,
            output_channels: self.outputs,
            default_sample_rate: self.sample_rates.first().copied().unwrap_or(48000),
        }
    }
}

struct Registered<C> {
    id: u64,
    request: StreamRequest,
    callback: C,
    error_callback: ErrorCallback,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    capture: Option<Registered<InputCallback>>,
    playback: Option<Registered<OutputCallback>>,
    failing: HashSet<String>,
    control_panels: Vec<String>,
    opened: u64,
}

impl MockState {
    fn busy(&self, direction: Direction) -> bool {
        match direction {
            Direction::Capture => self.capture.is_some(),
            Direction::Playback => self.playback.is_some(),
        }
    }
}

/// Removes its stream's callbacks from the host on drop.
struct MockStreamGuard {
    state: Weak<Mutex<MockState>>,
    direction: Direction,
    id: u64,
}

impl Drop for MockStreamGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        match self.direction {
            Direction::Capture => {
                if state.capture.as_ref().is_some_and(|r| r.id == self.id) {
                    state.capture = None;
                }
            }
            Direction::Playback => {
                if state.playback.as_ref().is_some_and(|r| r.id == self.id) {
                    state.playback = None;
                }
            }
        }
    }
}

/// Hand-driven [`AudioHost`].
pub struct MockHost {
    devices: Vec<MockDevice>,
    state: Arc<Mutex<MockState>>,
}

impl MockHost {
    /// Create a host exposing `devices`.
    pub fn new(devices: impl IntoIterator<Item = MockDevice>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Make every later open of `device` fail, as a busy driver would.
    pub fn fail_open(&self, device: impl Into<String>) {
        self.state.lock().failing.insert(device.into());
    }

    /// Deliver one captured block to the registered capture callback.
    ///
    /// Returns `false` when no capture stream is open.
    pub fn drive_capture(&self, data: &[f32]) -> bool {
        let mut state = self.state.lock();
        match state.capture.as_mut() {
            Some(stream) => {
                (stream.callback)(data);
                true
            }
            None => false,
        }
    }

    /// Ask the registered playback callback to fill `out`.
    ///
    /// Returns `false` (leaving `out` untouched) when no playback stream is open.
    pub fn drive_playback(&self, out: &mut [f32]) -> bool {
        let mut state = self.state.lock();
        match state.playback.as_mut() {
            Some(stream) => {
                (stream.callback)(out);
                true
            }
            None => false,
        }
    }

    /// Report a driver error on the open stream in `direction`.
    pub fn fire_error(&self, direction: Direction, message: &str) -> bool {
        let mut state = self.state.lock();
        let error_callback = match direction {
            Direction::Capture => state.capture.as_mut().map(|s| &mut s.error_callback),
            Direction::Playback => state.playback.as_mut().map(|s| &mut s.error_callback),
        };
        match error_callback {
            Some(callback) => {
                callback(message);
                true
            }
            None => false,
        }
    }

    /// Whether a stream is open in `direction`.
    pub fn is_streaming(&self, direction: Direction) -> bool {
        self.state.lock().busy(direction)
    }

    /// Request used for the stream currently open in `direction`.
    pub fn open_request(&self, direction: Direction) -> Option<StreamRequest> {
        let state = self.state.lock();
        match direction {
            Direction::Capture => state.capture.as_ref().map(|s| s.request.clone()),
            Direction::Playback => state.playback.as_ref().map(|s| s.request.clone()),
        }
    }

    /// Streams successfully opened since creation.
    pub fn streams_opened(&self) -> u64 {
        self.state.lock().opened
    }

    /// Devices whose control panel was requested, in order.
    pub fn control_panel_requests(&self) -> Vec<String> {
        self.state.lock().control_panels.clone()
    }

    fn device(&self, name: &str) -> Result<&MockDevice> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))
    }

    /// Check `request` against the device and reserve an id.
    fn admit(
        &self,
        state: &mut MockState,
        request: &StreamRequest,
        direction: Direction,
    ) -> Result<u64> {
        let device = self.device(&request.device)?;
        let open_error = |reason: String| Error::DeviceOpen {
            device: request.device.clone(),
            reason,
        };

        if state.failing.contains(&request.device) {
            return Err(open_error("device busy".to_string()));
        }
        if state.busy(direction) {
            return Err(open_error(format!("{} stream already open", direction)));
        }
        let available = device.info().channels(direction);
        if request.channels == 0 || request.channels > available {
            return Err(open_error(format!(
                "{} channels requested, {} available",
                request.channels, available
            )));
        }
        if !device.sample_rates.contains(&request.sample_rate) {
            return Err(open_error(format!(
                "unsupported sample rate {} Hz",
                request.sample_rate
            )));
        }

        state.next_id += 1;
        state.opened += 1;
        Ok(state.next_id)
    }

    fn guard(&self, direction: Direction, id: u64) -> StreamHandle {
        StreamHandle::new(MockStreamGuard {
            state: Arc::downgrade(&self.state),
            direction,
            id,
        })
    }
}

impl AudioHost for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(self.devices.iter().map(MockDevice::info).collect())
    }

    fn channel_names(&self, device: &str, direction: Direction) -> Result<Vec<String>> {
        let device = self.device(device)?;
        Ok(generic_channel_names(direction, device.info().channels(direction)))
    }

    fn supported_sample_rates(&self, device: &str, direction: Direction) -> Result<Vec<u32>> {
        let device = self.device(device)?;
        if device.info().channels(direction) == 0 {
            return Ok(Vec::new());
        }
        Ok(device.sample_rates.clone())
    }

    fn build_input_stream(
        &self,
        request: &StreamRequest,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let mut state = self.state.lock();
        let id = self.admit(&mut state, request, Direction::Capture)?;
        state.capture = Some(Registered {
            id,
            request: request.clone(),
            callback,
            error_callback,
        });
        Ok(self.guard(Direction::Capture, id))
    }

    fn build_output_stream(
        &self,
        request: &StreamRequest,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let mut state = self.state.lock();
        let id = self.admit(&mut state, request, Direction::Playback)?;
        state.playback = Some(Registered {
            id,
            request: request.clone(),
            callback,
            error_callback,
        });
        Ok(self.guard(Direction::Playback, id))
    }

    fn show_control_panel(&self, device: &str) -> Result<()> {
        self.device(device)?;
        self.state.lock().control_panels.push(device.to_string());
        Ok(())
    }
}
