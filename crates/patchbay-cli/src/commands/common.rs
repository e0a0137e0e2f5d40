//! Shared CLI helpers used across multiple commands.

use std::sync::Arc;

use clap::Args;
use patchbay_config::{SessionConfig, default_session_path, find_session};
use patchbay_core::{ChannelLayout, MeterSnapshot};
use patchbay_io::{AudioHost, CpalHost, Direction};

/// Open the named cpal host, or the platform default.
pub fn open_host(name: Option<&str>) -> anyhow::Result<Arc<dyn AudioHost>> {
    let host = match name {
        Some(name) => CpalHost::with_host_name(name)?,
        None => CpalHost::new(),
    };
    Ok(Arc::new(host))
}

/// `--output` flag to a stream direction.
pub fn direction(output: bool) -> Direction {
    if output {
        Direction::Playback
    } else {
        Direction::Capture
    }
}

/// Parse an `OUT=IN` route for clap's `value_parser`.
pub fn parse_route(s: &str) -> Result<(usize, usize), String> {
    let (out, input) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid route '{}' (expected OUT=IN)", s))?;
    let out = out
        .trim()
        .parse()
        .map_err(|_| format!("Invalid output channel '{}' in route '{}'", out, s))?;
    let input = input
        .trim()
        .parse()
        .map_err(|_| format!("Invalid input channel '{}' in route '{}'", input, s))?;
    Ok((out, input))
}

/// Session settings that can be given on the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionOverrides {
    /// Capture device (name, fragment or index)
    #[arg(long)]
    pub capture: Option<String>,

    /// Playback device (name, fragment or index)
    #[arg(long)]
    pub playback: Option<String>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Number of capture channels
    #[arg(long)]
    pub channels: Option<usize>,

    /// Playback layout (mono, stereo, 2.1, quad, 5.1, 7.1)
    #[arg(long)]
    pub layout: Option<ChannelLayout>,

    /// Route an output channel to an input channel (e.g. "0=1"); repeatable.
    /// Replaces the session's routes; unrouted outputs are silent.
    #[arg(long = "map", value_parser = parse_route)]
    pub routes: Vec<(usize, usize)>,

    /// Target latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<f32>,

    /// Maximum buffered audio in milliseconds
    #[arg(long)]
    pub max_buffer_ms: Option<f32>,

    /// Preferred device buffer size in frames
    #[arg(long)]
    pub block_frames: Option<u32>,

    /// Disable meter computation
    #[arg(long)]
    pub no_meters: bool,
}

impl SessionOverrides {
    /// Build a session from the overrides alone.
    pub fn to_session(&self) -> anyhow::Result<SessionConfig> {
        let (Some(capture), Some(playback)) = (&self.capture, &self.playback) else {
            anyhow::bail!("Both --capture and --playback are required without a session file");
        };
        Ok(self.apply(SessionConfig::new(capture.clone(), playback.clone())))
    }

    /// Apply every given override on top of `session`.
    pub fn apply(&self, mut session: SessionConfig) -> SessionConfig {
        if let Some(capture) = &self.capture {
            session.capture.device.clone_from(capture);
        }
        if let Some(playback) = &self.playback {
            session.playback.device.clone_from(playback);
        }
        if let Some(rate) = self.sample_rate {
            session = session.with_sample_rate(rate);
        }
        if let Some(channels) = self.channels {
            session = session.with_capture_channels(channels);
        }
        if let Some(layout) = self.layout {
            session = session.with_layout(layout);
        }
        if !self.routes.is_empty() {
            session.mapping.routes.clear();
            session = session.with_routes(self.routes.iter().copied());
        }
        if let Some(ms) = self.latency_ms {
            session = session.with_target_latency_ms(ms);
        }
        if let Some(ms) = self.max_buffer_ms {
            session = session.with_max_buffer_ms(ms);
        }
        if let Some(frames) = self.block_frames {
            session = session.with_block_frames(frames);
        }
        if self.no_meters {
            session = session.with_metering(false);
        }
        session
    }
}

/// Resolve the session for `run`.
///
/// Searches in this order:
/// 1. `config` as a path or saved session name
/// 2. The default session file, when both devices are not given
/// 3. The overrides alone
pub fn load_session(
    config: Option<&str>,
    overrides: &SessionOverrides,
) -> anyhow::Result<SessionConfig> {
    if let Some(name) = config {
        let Some(path) = find_session(name) else {
            anyhow::bail!(
                "Session '{}' not found. Use 'patchbay session list' to see saved sessions.",
                name
            );
        };
        return Ok(overrides.apply(SessionConfig::load(&path)?));
    }

    let default_path = default_session_path();
    if (overrides.capture.is_none() || overrides.playback.is_none()) && default_path.is_file() {
        tracing::info!(path = %default_path.display(), "using default session");
        return Ok(overrides.apply(SessionConfig::load(&default_path)?));
    }

    overrides.to_session()
}

/// One-line meter readout, e.g. `L -6.0  R -12.5  C -inf`.
pub fn format_meters(snapshot: &MeterSnapshot) -> String {
    snapshot
        .levels
        .iter()
        .map(|level| {
            let label = level
                .role
                .map_or_else(|| format!("{}", level.channel + 1), |r| r.short_label().to_string());
            if level.peak <= 0.0 {
                format!("{} -inf", label)
            } else {
                format!("{} {:.1}", label, level.peak_db())
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}
