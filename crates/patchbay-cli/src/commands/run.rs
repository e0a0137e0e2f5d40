//! Real-time bridge command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use patchbay_io::{Bridge, BridgeStats};

use super::common::{SessionOverrides, format_meters, load_session, open_host};

/// Poller sleep between checks.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args)]
pub struct RunArgs {
    /// Session file path or saved session name
    #[arg(short, long)]
    config: Option<String>,

    #[command(flatten)]
    overrides: SessionOverrides,

    /// Print buffer status every N milliseconds
    #[arg(long, default_value = "1000")]
    status_interval_ms: u64,

    /// Print meters every N milliseconds
    #[arg(long, default_value = "300")]
    meter_interval_ms: u64,
}

pub fn run(host_name: Option<&str>, args: RunArgs) -> anyhow::Result<()> {
    let session = load_session(args.config.as_deref(), &args.overrides)?;
    let host = open_host(host_name)?;

    let mut bridge = Bridge::new(host, session)?;

    println!("Bridging {} -> {}", bridge.capture_device(), bridge.playback_device());
    println!("  Sample rate: {} Hz", bridge.sample_rate());
    println!("  Layout: {}", bridge.layout());
    println!("  Mapping: {}", bridge.mapping());
    println!(
        "  Target latency: {} ms",
        bridge.session().target_latency_ms
    );

    if let Err(e) = bridge.start() {
        println!();
        println!("Bridge could not start: {}", e);
        println!("Tip: check the device settings with 'patchbay control-panel <device>'");
        bridge.dispose()?;
        return Err(e.into());
    }
    println!("\nPress Ctrl+C to stop...\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let status_interval = Duration::from_millis(args.status_interval_ms.max(1));
    let meter_interval = Duration::from_millis(args.meter_interval_ms.max(1));
    let mut last_status = Instant::now();
    let mut last_meters = Instant::now();

    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }
        if let Err(e) = bridge.poll_fault() {
            break Err(e);
        }

        if last_status.elapsed() >= status_interval {
            last_status = Instant::now();
            println!("{}", format_status(&bridge.stats()?));
        }
        if bridge.metering_enabled()? && last_meters.elapsed() >= meter_interval {
            last_meters = Instant::now();
            println!("  {}", format_meters(&bridge.snapshot()?));
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    let stats = bridge.stats()?;
    bridge.dispose()?;
    println!(
        "Done! {} overrun(s), {} underrun(s)",
        stats.overruns, stats.underruns
    );
    Ok(outcome?)
}

/// One-line status, e.g. `buffered 20.0 ms / 250.0 ms  overruns 0  underruns 0`.
fn format_status(stats: &BridgeStats) -> String {
    let mut line = format!(
        "buffered {:.1} ms / {:.1} ms  overruns {}  underruns {}",
        stats.buffered.as_secs_f64() * 1000.0,
        stats.max_buffered.as_secs_f64() * 1000.0,
        stats.overruns,
        stats.underruns
    );
    if stats.stream_errors > 0 {
        line.push_str(&format!("  errors {}", stats.stream_errors));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_io::BridgeState;

    #[test]
    fn status_line() {
        let mut stats = BridgeStats {
            overruns: 3,
            underruns: 0,
            stream_errors: 0,
            buffered: Duration::from_millis(20),
            max_buffered: Duration::from_millis(250),
            state: BridgeState::Started,
        };
        assert_eq!(
            format_status(&stats),
            "buffered 20.0 ms / 250.0 ms  overruns 3  underruns 0"
        );
        stats.stream_errors = 1;
        assert!(format_status(&stats).ends_with("errors 1"));
    }
}
