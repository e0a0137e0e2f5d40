//! Audio device listing command.

use clap::Args;
use patchbay_io::cpal_host::available_host_names;
use patchbay_io::{AudioDevice, Direction};

use super::common::open_host;

#[derive(Args)]
pub struct DevicesArgs {
    /// Also list the names of the compiled-in audio hosts
    #[arg(long)]
    hosts: bool,
}

pub fn run(host_name: Option<&str>, args: DevicesArgs) -> anyhow::Result<()> {
    if args.hosts {
        println!("Audio Hosts: {}", available_host_names().join(", "));
        println!();
    }

    let host = open_host(host_name)?;
    let devices = host.list_devices()?;

    if devices.is_empty() {
        println!("No audio devices found on host '{}'.", host.name());
        return Ok(());
    }

    let title = format!("Audio Devices ({})", host.name());
    println!("{}", title);
    println!("{}\n", "=".repeat(title.len()));

    let inputs = print_direction("Capture Devices", &devices, Direction::Capture);
    let outputs = print_direction("Playback Devices", &devices, Direction::Playback);

    println!("Total: {} capture, {} playback", inputs, outputs);
    println!();
    println!("Tip: Use device index or partial name with --capture/--playback:");
    println!("  patchbay run --capture 0 --playback 0 --layout 7.1");
    println!("  patchbay run --capture \"USB\" --playback \"Speakers\" --map 0=0 --map 1=1");

    Ok(())
}

fn print_direction(title: &str, devices: &[AudioDevice], direction: Direction) -> usize {
    let matching: Vec<_> = devices.iter().filter(|d| d.supports(direction)).collect();
    if matching.is_empty() {
        return 0;
    }

    println!("{}:", title);
    for (idx, device) in matching.iter().enumerate() {
        println!(
            "  [{}] {} ({} ch, {} Hz)",
            idx,
            device.name,
            device.channels(direction),
            device.default_sample_rate
        );
    }
    println!();
    matching.len()
}
